// src/services/maintenance_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        maintenance_repo::{NewTask, TaskPatch},
        MaintenanceRepository, TripRepository, VesselRepository,
    },
    middleware::tenancy::OrgContext,
    models::maintenance::{
        CadenceType, MaintenanceLogView, MaintenanceTask, MaintenanceTaskDetail, MaintenanceTaskView,
    },
    rules::{
        maintenance::{
            hours_projection, reschedule_on_update, rollforward_after_log, schedule_new_task, Cadence,
            CadencePatch,
        },
        ordering::{next_sort_order, plan_reorder},
    },
    services::vessel_service::require_vessel,
};

pub struct TaskDraft<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub cadence_type: CadenceType,
    pub interval_days: Option<i32>,
    pub interval_hours: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub critical: bool,
    pub is_active: bool,
}

#[derive(Default)]
pub struct TaskUpdate<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub cadence_type: Option<CadenceType>,
    pub interval_days: Option<Option<i32>>,
    pub interval_hours: Option<Option<Decimal>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub critical: Option<bool>,
    pub is_active: Option<bool>,
}

fn cadence_of(task: &MaintenanceTask) -> Cadence {
    Cadence {
        cadence_type: task.cadence_type,
        interval_days: task.interval_days,
        interval_hours: task.interval_hours,
        due_date: task.due_date,
    }
}

/// Anexa a projeção por horas (não persistida) à tarefa.
pub fn task_view(task: MaintenanceTask, total_hours: Decimal) -> MaintenanceTaskView {
    let (due_at_hours, hours_remaining) =
        hours_projection(task.interval_hours, task.last_completed_total_hours, total_hours);
    MaintenanceTaskView {
        task,
        due_at_hours,
        hours_remaining,
    }
}

#[derive(Clone)]
pub struct MaintenanceService {
    pool: PgPool,
    maintenance_repo: MaintenanceRepository,
    vessel_repo: VesselRepository,
    trip_repo: TripRepository,
}

impl MaintenanceService {
    pub fn new(
        pool: PgPool,
        maintenance_repo: MaintenanceRepository,
        vessel_repo: VesselRepository,
        trip_repo: TripRepository,
    ) -> Self {
        Self { pool, maintenance_repo, vessel_repo, trip_repo }
    }

    async fn require_task(&self, ctx: &OrgContext, task_id: Uuid) -> Result<MaintenanceTask, AppError> {
        self.maintenance_repo
            .find_task_in_org(&self.pool, ctx.org_id, task_id, false)
            .await?
            .ok_or(AppError::NotFound("maintenance_task"))
    }

    pub async fn list_tasks(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vec<MaintenanceTaskView>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;

        let total = self.trip_repo.total_hours(&self.pool, vessel_id).await?;
        let tasks = self.maintenance_repo.list_tasks(vessel_id).await?;
        Ok(tasks.into_iter().map(|task| task_view(task, total)).collect())
    }

    pub async fn create_task(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        draft: &TaskDraft<'_>,
    ) -> Result<MaintenanceTaskView, AppError> {
        let cadence = Cadence {
            cadence_type: draft.cadence_type,
            interval_days: draft.interval_days,
            interval_hours: draft.interval_hours,
            due_date: draft.due_date,
        };
        let next_due_at = schedule_new_task(&cadence, draft.next_due_at, Utc::now())?;

        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        // Intervalo em horas começa a contar das horas já registradas.
        let total = self.trip_repo.total_hours(&mut *tx, vessel_id).await?;
        let baseline = draft.interval_hours.map(|_| total);

        let max = self.maintenance_repo.max_sort_order(&mut *tx, vessel_id).await?;
        let task = self
            .maintenance_repo
            .create_task(
                &mut *tx,
                &NewTask {
                    vessel_id,
                    name: draft.name.trim(),
                    description: draft.description,
                    cadence_type: draft.cadence_type,
                    interval_days: draft.interval_days,
                    interval_hours: draft.interval_hours,
                    due_date: draft.due_date,
                    next_due_at,
                    last_completed_total_hours: baseline,
                    critical: draft.critical,
                    is_active: draft.is_active,
                    sort_order: next_sort_order(max),
                },
            )
            .await?;

        tx.commit().await?;
        Ok(task_view(task, total))
    }

    pub async fn get_task(&self, ctx: &OrgContext, task_id: Uuid) -> Result<MaintenanceTaskDetail, AppError> {
        let task = self.require_task(ctx, task_id).await?;
        let total = self.trip_repo.total_hours(&self.pool, task.vessel_id).await?;
        let logs = self.maintenance_repo.list_logs(task_id).await?;
        Ok(MaintenanceTaskDetail {
            task: task_view(task, total),
            logs,
        })
    }

    pub async fn update_task(
        &self,
        ctx: &OrgContext,
        task_id: Uuid,
        update: &TaskUpdate<'_>,
    ) -> Result<MaintenanceTaskView, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .maintenance_repo
            .find_task_in_org(&mut *tx, ctx.org_id, task_id, true)
            .await?
            .ok_or(AppError::NotFound("maintenance_task"))?;

        let next_due_at = reschedule_on_update(
            &cadence_of(&current),
            &CadencePatch {
                cadence_type: update.cadence_type,
                interval_days: update.interval_days,
                interval_hours: update.interval_hours,
                due_date: update.due_date,
                next_due_at: update.next_due_at,
            },
            Utc::now(),
        )?;

        let total = self.trip_repo.total_hours(&mut *tx, current.vessel_id).await?;
        // Intervalo em horas novo numa tarefa sem linha de base: conta a partir de agora.
        let hours_baseline = match update.interval_hours {
            Some(Some(_)) if current.last_completed_total_hours.is_none() => Some(total),
            _ => None,
        };

        let task = self
            .maintenance_repo
            .update_task(
                &mut *tx,
                task_id,
                &TaskPatch {
                    name: update.name.map(str::trim),
                    description: update.description,
                    cadence_type: update.cadence_type,
                    interval_days: update.interval_days,
                    interval_hours: update.interval_hours,
                    due_date: update.due_date,
                    next_due_at,
                    hours_baseline,
                    critical: update.critical,
                    is_active: update.is_active,
                },
            )
            .await?;

        tx.commit().await?;
        Ok(task_view(task, total))
    }

    pub async fn delete_task(&self, ctx: &OrgContext, task_id: Uuid) -> Result<(), AppError> {
        self.require_task(ctx, task_id).await?;
        self.maintenance_repo.delete_task(task_id).await
    }

    /// A lista precisa conter exatamente as tarefas da embarcação; senão nada muda.
    pub async fn reorder_tasks(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        task_ids: &[Uuid],
    ) -> Result<Vec<MaintenanceTaskView>, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        let existing = self.maintenance_repo.task_ids(&mut *tx, vessel_id).await?;
        let plan = plan_reorder("task_ids", &existing, task_ids)?;
        for (task_id, position) in plan {
            self.maintenance_repo.set_sort_order(&mut *tx, task_id, position).await?;
        }

        tx.commit().await?;
        self.list_tasks(ctx, vessel_id).await
    }

    // --- Logs ---

    pub async fn create_log(
        &self,
        ctx: &OrgContext,
        task_id: Uuid,
        performed_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<MaintenanceLogView, AppError> {
        let performed_at = performed_at.unwrap_or_else(Utc::now);
        let mut tx = self.pool.begin().await?;

        let task = self
            .maintenance_repo
            .find_task_in_org(&mut *tx, ctx.org_id, task_id, true)
            .await?
            .ok_or(AppError::NotFound("maintenance_task"))?;

        let log = self
            .maintenance_repo
            .create_log(&mut *tx, task_id, ctx.user.id, performed_at, notes)
            .await?;

        let next_due_at = rollforward_after_log(&cadence_of(&task), performed_at);
        let total = self.trip_repo.total_hours(&mut *tx, task.vessel_id).await?;
        self.maintenance_repo
            .record_completion(&mut *tx, task_id, performed_at, Some(total), next_due_at)
            .await?;

        tx.commit().await?;
        Ok(MaintenanceLogView {
            log,
            performed_by_name: ctx.user.name.clone(),
            performed_by_email: ctx.user.email.clone(),
        })
    }

    pub async fn list_logs(&self, ctx: &OrgContext, task_id: Uuid) -> Result<Vec<MaintenanceLogView>, AppError> {
        self.require_task(ctx, task_id).await?;
        self.maintenance_repo.list_logs(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::seed_vessel;

    fn task(interval_hours: Option<Decimal>, baseline: Option<Decimal>) -> MaintenanceTask {
        let now = Utc::now();
        MaintenanceTask {
            id: Uuid::new_v4(),
            vessel_id: Uuid::new_v4(),
            name: "Impeller".into(),
            description: None,
            cadence_type: CadenceType::Interval,
            interval_days: None,
            interval_hours,
            due_date: None,
            next_due_at: None,
            last_completed_at: None,
            last_completed_total_hours: baseline,
            critical: false,
            is_active: true,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn view_projects_hours_from_the_baseline() {
        let view = task_view(task(Some(Decimal::new(100, 0)), Some(Decimal::new(40, 0))), Decimal::new(1255, 1));
        assert_eq!(view.due_at_hours, Some(Decimal::new(140, 0)));
        assert_eq!(view.hours_remaining, Some(Decimal::new(145, 1)));
    }

    #[test]
    fn view_without_hour_interval_has_no_projection() {
        let view = task_view(task(None, None), Decimal::new(10, 0));
        assert_eq!(view.due_at_hours, None);
        assert_eq!(view.hours_remaining, None);
    }

    fn service(pool: &PgPool) -> MaintenanceService {
        MaintenanceService::new(
            pool.clone(),
            MaintenanceRepository::new(pool.clone()),
            VesselRepository::new(pool.clone()),
            TripRepository::new(pool.clone()),
        )
    }

    async fn seed_task(pool: &PgPool, vessel_id: Uuid, name: &str, sort_order: i32) -> MaintenanceTask {
        MaintenanceRepository::new(pool.clone())
            .create_task(
                pool,
                &NewTask {
                    vessel_id,
                    name,
                    description: None,
                    cadence_type: CadenceType::Interval,
                    interval_days: Some(30),
                    interval_hours: None,
                    due_date: None,
                    next_due_at: None,
                    last_completed_total_hours: None,
                    critical: false,
                    is_active: true,
                    sort_order,
                },
            )
            .await
            .expect("task")
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn reorder_with_unknown_task_changes_nothing(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let first = seed_task(&pool, vessel.id, "Impeller", 0).await;
        let second = seed_task(&pool, vessel.id, "Zincs", 1).await;

        let result = service(&pool)
            .reorder_tasks(&ctx, vessel.id, &[second.id, Uuid::new_v4()])
            .await;
        assert!(matches!(result, Err(AppError::RuleViolation(_))));

        let tasks = MaintenanceRepository::new(pool.clone()).list_tasks(vessel.id).await.expect("tasks");
        let order: Vec<(Uuid, i32)> = tasks.iter().map(|t| (t.id, t.sort_order)).collect();
        assert_eq!(order, vec![(first.id, 0), (second.id, 1)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn reorder_assigns_positions_in_list_order(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let first = seed_task(&pool, vessel.id, "Impeller", 0).await;
        let second = seed_task(&pool, vessel.id, "Zincs", 1).await;

        let views = service(&pool)
            .reorder_tasks(&ctx, vessel.id, &[second.id, first.id])
            .await
            .expect("reorder");
        let order: Vec<Uuid> = views.iter().map(|v| v.task.id).collect();
        assert_eq!(order, vec![second.id, first.id]);
    }

    fn draft(interval_days: Option<i32>, interval_hours: Option<Decimal>) -> TaskDraft<'static> {
        TaskDraft {
            name: "Change engine oil",
            description: None,
            cadence_type: CadenceType::Interval,
            interval_days,
            interval_hours,
            due_date: None,
            next_due_at: None,
            critical: false,
            is_active: true,
        }
    }

    async fn log_hours(pool: &PgPool, ctx: &OrgContext, vessel_id: Uuid, hours: i64) {
        crate::services::trip_service::TripService::new(
            pool.clone(),
            TripRepository::new(pool.clone()),
            VesselRepository::new(pool.clone()),
            crate::db::InventoryRepository::new(pool.clone()),
        )
        .log_trip(ctx, vessel_id, Decimal::from(hours), None, None)
        .await
        .expect("trip");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn ninety_day_task_is_due_ninety_days_after_creation(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;

        let before = Utc::now();
        let view = service(&pool)
            .create_task(&ctx, vessel.id, &draft(Some(90), None))
            .await
            .expect("task");
        let after = Utc::now();

        let next_due = view.task.next_due_at.expect("next due");
        assert!(next_due >= before + chrono::Duration::days(90) - chrono::Duration::seconds(1));
        assert!(next_due <= after + chrono::Duration::days(90) + chrono::Duration::seconds(1));
        assert_eq!(view.task.sort_order, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn zero_interval_hours_is_a_rule_violation(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;

        let result = service(&pool)
            .create_task(&ctx, vessel.id, &draft(None, Some(Decimal::ZERO)))
            .await;
        assert!(matches!(result, Err(AppError::RuleViolation(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn log_rolls_the_task_forward(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);
        let view = service
            .create_task(&ctx, vessel.id, &draft(Some(30), Some(Decimal::from(100))))
            .await
            .expect("task");
        log_hours(&pool, &ctx, vessel.id, 12).await;

        let performed_at = Utc::now() - chrono::Duration::days(2);
        service
            .create_log(&ctx, view.task.id, Some(performed_at), Some("Oil and filter"))
            .await
            .expect("log");

        let detail = service.get_task(&ctx, view.task.id).await.expect("detail");
        let task = &detail.task.task;
        let last = task.last_completed_at.expect("last completed");
        assert!((last - performed_at).num_milliseconds().abs() < 1);
        let next = task.next_due_at.expect("next due");
        assert!((next - (performed_at + chrono::Duration::days(30))).num_milliseconds().abs() < 1);
        assert_eq!(task.last_completed_total_hours, Some(Decimal::from(12)));
        assert_eq!(detail.task.due_at_hours, Some(Decimal::from(112)));
        assert_eq!(detail.task.hours_remaining, Some(Decimal::from(100)));
        assert_eq!(detail.logs.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn adding_an_hour_interval_starts_from_current_hours(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);
        let view = service
            .create_task(&ctx, vessel.id, &draft(Some(30), None))
            .await
            .expect("task");
        assert_eq!(view.task.last_completed_total_hours, None);
        log_hours(&pool, &ctx, vessel.id, 40).await;

        let updated = service
            .update_task(
                &ctx,
                view.task.id,
                &TaskUpdate { interval_hours: Some(Some(Decimal::from(50))), ..Default::default() },
            )
            .await
            .expect("update");

        assert_eq!(updated.task.last_completed_total_hours, Some(Decimal::from(40)));
        assert_eq!(updated.due_at_hours, Some(Decimal::from(90)));
        assert_eq!(updated.hours_remaining, Some(Decimal::from(50)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn patch_clears_nullable_task_fields(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);
        let view = service
            .create_task(&ctx, vessel.id, &draft(Some(30), Some(Decimal::from(100))))
            .await
            .expect("task");

        let updated = service
            .update_task(
                &ctx,
                view.task.id,
                &TaskUpdate { interval_days: Some(None), description: Some(None), ..Default::default() },
            )
            .await
            .expect("update");
        assert_eq!(updated.task.interval_days, None);
        assert_eq!(updated.task.interval_hours, Some(Decimal::from(100)));

        // sem nenhum intervalo a tarefa INTERVAL fica inválida
        let result = service
            .update_task(
                &ctx,
                view.task.id,
                &TaskUpdate { interval_hours: Some(None), ..Default::default() },
            )
            .await;
        assert!(matches!(result, Err(AppError::RuleViolation(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn task_list_is_stable_between_reads(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        seed_task(&pool, vessel.id, "Zincs", 0).await;
        seed_task(&pool, vessel.id, "Impeller", 0).await;
        seed_task(&pool, vessel.id, "Bilge pump", 1).await;

        let names = |views: Vec<MaintenanceTaskView>| views.into_iter().map(|v| v.task.name).collect::<Vec<_>>();
        let first = names(service(&pool).list_tasks(&ctx, vessel.id).await.expect("first"));
        let second = names(service(&pool).list_tasks(&ctx, vessel.id).await.expect("second"));
        assert_eq!(first, vec!["Impeller", "Zincs", "Bilge pump"]);
        assert_eq!(first, second);
    }
}
