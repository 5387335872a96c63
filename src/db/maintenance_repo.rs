// src/db/maintenance_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::maintenance::{CadenceType, MaintenanceLog, MaintenanceLogView, MaintenanceTask},
};

pub struct NewTask<'a> {
    pub vessel_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub cadence_type: CadenceType,
    pub interval_days: Option<i32>,
    pub interval_hours: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub last_completed_total_hours: Option<Decimal>,
    pub critical: bool,
    pub is_active: bool,
    pub sort_order: i32,
}

/// PATCH de tarefa. `next_due_at` já vem resolvido pela regra de cadência.
#[derive(Default)]
pub struct TaskPatch<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub cadence_type: Option<CadenceType>,
    pub interval_days: Option<Option<i32>>,
    pub interval_hours: Option<Option<Decimal>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub next_due_at: Option<Option<DateTime<Utc>>>,
    /// Só é gravado se a tarefa ainda não tem `last_completed_total_hours`.
    pub hours_baseline: Option<Decimal>,
    pub critical: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_tasks(&self, vessel_id: Uuid) -> Result<Vec<MaintenanceTask>, AppError> {
        let tasks = sqlx::query_as::<_, MaintenanceTask>(
            r#"
            SELECT * FROM maintenance_tasks
            WHERE vessel_id = $1
            ORDER BY sort_order ASC NULLS LAST, name ASC, id ASC
            "#,
        )
        .bind(vessel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    /// Tarefa resolvida pelo tenant; `lock` trava a linha.
    pub async fn find_task_in_org<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        task_id: Uuid,
        lock: bool,
    ) -> Result<Option<MaintenanceTask>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if lock {
            r#"
            SELECT t.* FROM maintenance_tasks t
            JOIN vessels v ON v.id = t.vessel_id
            WHERE t.id = $1 AND v.org_id = $2
            FOR UPDATE OF t
            "#
        } else {
            r#"
            SELECT t.* FROM maintenance_tasks t
            JOIN vessels v ON v.id = t.vessel_id
            WHERE t.id = $1 AND v.org_id = $2
            "#
        };
        let task = sqlx::query_as::<_, MaintenanceTask>(sql)
            .bind(task_id)
            .bind(org_id)
            .fetch_optional(executor)
            .await?;
        Ok(task)
    }

    pub async fn max_sort_order<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sort_order) FROM maintenance_tasks WHERE vessel_id = $1",
        )
        .bind(vessel_id)
        .fetch_one(executor)
        .await?;
        Ok(max)
    }

    pub async fn create_task<'e, E>(&self, executor: E, new: &NewTask<'_>) -> Result<MaintenanceTask, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, MaintenanceTask>(
            r#"
            INSERT INTO maintenance_tasks (
                vessel_id, name, description, cadence_type, interval_days, interval_hours,
                due_date, next_due_at, last_completed_total_hours, critical, is_active, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(new.vessel_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.cadence_type)
        .bind(new.interval_days)
        .bind(new.interval_hours)
        .bind(new.due_date)
        .bind(new.next_due_at)
        .bind(new.last_completed_total_hours)
        .bind(new.critical)
        .bind(new.is_active)
        .bind(new.sort_order)
        .fetch_one(executor)
        .await?;
        Ok(task)
    }

    pub async fn update_task<'e, E>(&self, executor: E, task_id: Uuid, patch: &TaskPatch<'_>) -> Result<MaintenanceTask, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, MaintenanceTask>(
            r#"
            UPDATE maintenance_tasks
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                cadence_type = COALESCE($5, cadence_type),
                interval_days = CASE WHEN $6 THEN $7 ELSE interval_days END,
                interval_hours = CASE WHEN $8 THEN $9 ELSE interval_hours END,
                due_date = CASE WHEN $10 THEN $11 ELSE due_date END,
                next_due_at = CASE WHEN $12 THEN $13 ELSE next_due_at END,
                last_completed_total_hours = COALESCE(last_completed_total_hours, $14),
                critical = COALESCE($15, critical),
                is_active = COALESCE($16, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.cadence_type)
        .bind(patch.interval_days.is_some())
        .bind(patch.interval_days.flatten())
        .bind(patch.interval_hours.is_some())
        .bind(patch.interval_hours.flatten())
        .bind(patch.due_date.is_some())
        .bind(patch.due_date.flatten())
        .bind(patch.next_due_at.is_some())
        .bind(patch.next_due_at.flatten())
        .bind(patch.hours_baseline)
        .bind(patch.critical)
        .bind(patch.is_active)
        .fetch_one(executor)
        .await?;
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM maintenance_tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn task_ids<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM maintenance_tasks WHERE vessel_id = $1")
            .bind(vessel_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn set_sort_order<'e, E>(&self, executor: E, task_id: Uuid, sort_order: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE maintenance_tasks SET sort_order = $2, updated_at = now() WHERE id = $1")
            .bind(task_id)
            .bind(sort_order)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Marca a conclusão: data, horas acumuladas e (se houver) novo vencimento.
    pub async fn record_completion<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
        performed_at: DateTime<Utc>,
        total_hours: Option<Decimal>,
        next_due_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE maintenance_tasks
            SET last_completed_at = $2,
                last_completed_total_hours = COALESCE($3, last_completed_total_hours),
                next_due_at = COALESCE($4, next_due_at),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(performed_at)
        .bind(total_hours)
        .bind(next_due_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    // --- Logs ---

    pub async fn create_log<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
        user_id: Uuid,
        performed_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<MaintenanceLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, MaintenanceLog>(
            r#"
            INSERT INTO maintenance_logs (maintenance_task_id, performed_by_user_id, performed_at, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(performed_at)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(log)
    }

    pub async fn list_logs(&self, task_id: Uuid) -> Result<Vec<MaintenanceLogView>, AppError> {
        let logs = sqlx::query_as::<_, MaintenanceLogView>(
            r#"
            SELECT l.*, u.name AS performed_by_name, u.email AS performed_by_email
            FROM maintenance_logs l
            JOIN users u ON u.id = l.performed_by_user_id
            WHERE l.maintenance_task_id = $1
            ORDER BY l.performed_at DESC, l.id DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
