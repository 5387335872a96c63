// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{
        CheckLineCondition, InventoryAdjustment, InventoryCheck, InventoryCheckLine,
        InventoryCheckStatus, InventoryGroup, InventoryRequirement, RequirementHistoryEntry,
    },
    rules::consumption::StockChange,
};

pub struct NewRequirement<'a> {
    pub vessel_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    pub item_name: &'a str,
    pub required_quantity: i32,
    pub category: Option<&'a str>,
    pub critical: bool,
    pub notes: Option<&'a str>,
    pub sort_order: i32,
    pub current_quantity: i32,
    pub auto_consume_enabled: bool,
    pub consume_per_hour: Option<Decimal>,
}

/// PATCH de item. Os campos "anuláveis" vêm como Option<Option<_>>:
/// `Some(None)` limpa o valor, `None` mantém.
#[derive(Default)]
pub struct RequirementPatch<'a> {
    pub parent_group_id: Option<Option<Uuid>>,
    pub item_name: Option<&'a str>,
    pub required_quantity: Option<i32>,
    pub category: Option<Option<&'a str>>,
    pub critical: Option<bool>,
    pub notes: Option<Option<&'a str>>,
    pub auto_consume_enabled: Option<bool>,
    pub consume_per_hour: Option<Option<Decimal>>,
}

pub struct NewAdjustment<'a> {
    pub requirement_id: Uuid,
    pub reason: &'a str,
    pub reference_trip_id: Option<Uuid>,
    pub change: StockChange,
    pub note: Option<&'a str>,
    pub created_by_user_id: Uuid,
}

/// Linha de conferência junto com o estoque atual do item (para o envio).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LineToReconcile {
    pub requirement_id: Uuid,
    pub actual_quantity: i32,
    pub current_quantity: i32,
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  1. GRUPOS
    // =========================================================================

    pub async fn list_groups(&self, vessel_id: Uuid) -> Result<Vec<InventoryGroup>, AppError> {
        let groups = sqlx::query_as::<_, InventoryGroup>(
            "SELECT * FROM inventory_groups WHERE vessel_id = $1 ORDER BY sort_order ASC, name ASC",
        )
        .bind(vessel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// Grupo resolvido pelo tenant (join com vessels).
    pub async fn find_group_in_org<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<InventoryGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = sqlx::query_as::<_, InventoryGroup>(
            r#"
            SELECT g.*
            FROM inventory_groups g
            JOIN vessels v ON v.id = g.vessel_id
            WHERE g.id = $1 AND v.org_id = $2
            "#,
        )
        .bind(group_id)
        .bind(org_id)
        .fetch_optional(executor)
        .await?;
        Ok(group)
    }

    pub async fn group_belongs_to_vessel<'e, E>(&self, executor: E, vessel_id: Uuid, group_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM inventory_groups WHERE id = $1 AND vessel_id = $2)",
        )
        .bind(group_id)
        .bind(vessel_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn max_group_sort_order<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sort_order) FROM inventory_groups WHERE vessel_id = $1",
        )
        .bind(vessel_id)
        .fetch_one(executor)
        .await?;
        Ok(max)
    }

    pub async fn create_group<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
        name: &str,
        description: Option<&str>,
        sort_order: i32,
    ) -> Result<InventoryGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = sqlx::query_as::<_, InventoryGroup>(
            r#"
            INSERT INTO inventory_groups (vessel_id, name, description, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(vessel_id)
        .bind(name)
        .bind(description)
        .bind(sort_order)
        .fetch_one(executor)
        .await?;
        Ok(group)
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<InventoryGroup, AppError> {
        let group = sqlx::query_as::<_, InventoryGroup>(
            r#"
            UPDATE inventory_groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    /// Os itens do grupo ficam sem grupo (FK ON DELETE SET NULL).
    pub async fn delete_group(&self, group_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM inventory_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn group_ids<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM inventory_groups WHERE vessel_id = $1")
            .bind(vessel_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn set_group_sort_order<'e, E>(&self, executor: E, group_id: Uuid, sort_order: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE inventory_groups SET sort_order = $2, updated_at = now() WHERE id = $1")
            .bind(group_id)
            .bind(sort_order)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  2. ITENS EXIGIDOS (REQUIREMENTS)
    // =========================================================================

    /// Ordem de exibição: grupos (na ordem deles), depois itens sem grupo.
    pub async fn list_requirements<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Vec<InventoryRequirement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirements = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            SELECT r.*
            FROM vessel_inventory_requirements r
            LEFT JOIN inventory_groups g ON g.id = r.parent_group_id
            WHERE r.vessel_id = $1
            ORDER BY g.sort_order ASC NULLS LAST, r.sort_order ASC, r.created_at ASC
            "#,
        )
        .bind(vessel_id)
        .fetch_all(executor)
        .await?;
        Ok(requirements)
    }

    pub async fn find_requirement_in_org<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        requirement_id: Uuid,
    ) -> Result<Option<InventoryRequirement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            SELECT r.*
            FROM vessel_inventory_requirements r
            JOIN vessels v ON v.id = r.vessel_id
            WHERE r.id = $1 AND v.org_id = $2
            "#,
        )
        .bind(requirement_id)
        .bind(org_id)
        .fetch_optional(executor)
        .await?;
        Ok(requirement)
    }

    /// Igual ao anterior, mas trava a linha até o fim da transação.
    pub async fn find_requirement_for_update<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        requirement_id: Uuid,
    ) -> Result<Option<InventoryRequirement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            SELECT r.*
            FROM vessel_inventory_requirements r
            JOIN vessels v ON v.id = r.vessel_id
            WHERE r.id = $1 AND v.org_id = $2
            FOR UPDATE OF r
            "#,
        )
        .bind(requirement_id)
        .bind(org_id)
        .fetch_optional(executor)
        .await?;
        Ok(requirement)
    }

    /// MAX(sort_order) dentro do mesmo grupo (NULL = sem grupo).
    pub async fn max_requirement_sort_order<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MAX(sort_order) FROM vessel_inventory_requirements
            WHERE vessel_id = $1 AND parent_group_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(vessel_id)
        .bind(group_id)
        .fetch_one(executor)
        .await?;
        Ok(max)
    }

    pub async fn create_requirement<'e, E>(&self, executor: E, new: &NewRequirement<'_>) -> Result<InventoryRequirement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            INSERT INTO vessel_inventory_requirements (
                vessel_id, parent_group_id, item_name, required_quantity, category, critical,
                notes, sort_order, current_quantity, auto_consume_enabled, consume_per_hour
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(new.vessel_id)
        .bind(new.parent_group_id)
        .bind(new.item_name)
        .bind(new.required_quantity)
        .bind(new.category)
        .bind(new.critical)
        .bind(new.notes)
        .bind(new.sort_order)
        .bind(new.current_quantity)
        .bind(new.auto_consume_enabled)
        .bind(new.consume_per_hour)
        .fetch_one(executor)
        .await?;
        Ok(requirement)
    }

    pub async fn update_requirement<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        patch: &RequirementPatch<'_>,
    ) -> Result<InventoryRequirement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            UPDATE vessel_inventory_requirements
            SET parent_group_id = CASE WHEN $2 THEN $3 ELSE parent_group_id END,
                item_name = COALESCE($4, item_name),
                required_quantity = COALESCE($5, required_quantity),
                category = CASE WHEN $6 THEN $7 ELSE category END,
                critical = COALESCE($8, critical),
                notes = CASE WHEN $9 THEN $10 ELSE notes END,
                auto_consume_enabled = COALESCE($11, auto_consume_enabled),
                consume_per_hour = CASE WHEN $12 THEN $13 ELSE consume_per_hour END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(requirement_id)
        .bind(patch.parent_group_id.is_some())
        .bind(patch.parent_group_id.flatten())
        .bind(patch.item_name)
        .bind(patch.required_quantity)
        .bind(patch.category.is_some())
        .bind(patch.category.flatten())
        .bind(patch.critical)
        .bind(patch.notes.is_some())
        .bind(patch.notes.flatten())
        .bind(patch.auto_consume_enabled)
        .bind(patch.consume_per_hour.is_some())
        .bind(patch.consume_per_hour.flatten())
        .fetch_one(executor)
        .await?;
        Ok(requirement)
    }

    pub async fn delete_requirement(&self, requirement_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vessel_inventory_requirements WHERE id = $1")
            .bind(requirement_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn requirement_ids_in_group<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM vessel_inventory_requirements
            WHERE vessel_id = $1 AND parent_group_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(vessel_id)
        .bind(group_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn set_requirement_sort_order<'e, E>(&self, executor: E, requirement_id: Uuid, sort_order: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE vessel_inventory_requirements SET sort_order = $2, updated_at = now() WHERE id = $1")
            .bind(requirement_id)
            .bind(sort_order)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Itens com consumo automático, travados para a transação da viagem.
    pub async fn auto_consume_requirements_for_update<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
    ) -> Result<Vec<InventoryRequirement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirements = sqlx::query_as::<_, InventoryRequirement>(
            r#"
            SELECT * FROM vessel_inventory_requirements
            WHERE vessel_id = $1
              AND auto_consume_enabled = TRUE
              AND consume_per_hour > 0
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(vessel_id)
        .fetch_all(executor)
        .await?;
        Ok(requirements)
    }

    pub async fn set_current_quantity<'e, E>(&self, executor: E, requirement_id: Uuid, quantity: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE vessel_inventory_requirements SET current_quantity = $2, updated_at = now() WHERE id = $1")
            .bind(requirement_id)
            .bind(quantity)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Histórico do item: linhas de conferência, mais recentes primeiro.
    pub async fn list_history(&self, requirement_id: Uuid) -> Result<Vec<RequirementHistoryEntry>, AppError> {
        let history = sqlx::query_as::<_, RequirementHistoryEntry>(
            r#"
            SELECT l.*, c.status AS check_status, c.performed_at
            FROM inventory_check_lines l
            JOIN inventory_checks c ON c.id = l.inventory_check_id
            WHERE l.requirement_id = $1
            ORDER BY l.updated_at DESC
            "#,
        )
        .bind(requirement_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }

    // =========================================================================
    //  3. AJUSTES (AUDITORIA)
    // =========================================================================

    pub async fn insert_adjustment<'e, E>(&self, executor: E, new: &NewAdjustment<'_>) -> Result<InventoryAdjustment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let adjustment = sqlx::query_as::<_, InventoryAdjustment>(
            r#"
            INSERT INTO inventory_adjustments (
                requirement_id, reason, reference_trip_id, delta, before_qty, after_qty, note, created_by_user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.requirement_id)
        .bind(new.reason)
        .bind(new.reference_trip_id)
        .bind(new.change.delta)
        .bind(new.change.before_qty)
        .bind(new.change.after_qty)
        .bind(new.note)
        .bind(new.created_by_user_id)
        .fetch_one(executor)
        .await?;
        Ok(adjustment)
    }

    pub async fn list_adjustments(&self, requirement_id: Uuid) -> Result<Vec<InventoryAdjustment>, AppError> {
        let adjustments = sqlx::query_as::<_, InventoryAdjustment>(
            "SELECT * FROM inventory_adjustments WHERE requirement_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(requirement_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(adjustments)
    }

    // =========================================================================
    //  4. CONFERÊNCIAS
    // =========================================================================

    pub async fn create_check<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
        user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<InventoryCheck, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let check = sqlx::query_as::<_, InventoryCheck>(
            r#"
            INSERT INTO inventory_checks (vessel_id, performed_by_user_id, notes)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(vessel_id)
        .bind(user_id)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(check)
    }

    /// Uma linha por item da embarcação, começando com a quantidade atual.
    pub async fn seed_check_lines<'e, E>(&self, executor: E, check_id: Uuid, vessel_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO inventory_check_lines (inventory_check_id, requirement_id, actual_quantity)
            SELECT $1, r.id, r.current_quantity
            FROM vessel_inventory_requirements r
            WHERE r.vessel_id = $2
            "#,
        )
        .bind(check_id)
        .bind(vessel_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_checks(&self, vessel_id: Uuid) -> Result<Vec<InventoryCheck>, AppError> {
        let checks = sqlx::query_as::<_, InventoryCheck>(
            "SELECT * FROM inventory_checks WHERE vessel_id = $1 ORDER BY performed_at DESC, id DESC",
        )
        .bind(vessel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(checks)
    }

    pub async fn find_check_in_org<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        check_id: Uuid,
        lock: bool,
    ) -> Result<Option<InventoryCheck>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if lock {
            r#"
            SELECT c.* FROM inventory_checks c
            JOIN vessels v ON v.id = c.vessel_id
            WHERE c.id = $1 AND v.org_id = $2
            FOR UPDATE OF c
            "#
        } else {
            r#"
            SELECT c.* FROM inventory_checks c
            JOIN vessels v ON v.id = c.vessel_id
            WHERE c.id = $1 AND v.org_id = $2
            "#
        };
        let check = sqlx::query_as::<_, InventoryCheck>(sql)
            .bind(check_id)
            .bind(org_id)
            .fetch_optional(executor)
            .await?;
        Ok(check)
    }

    pub async fn list_check_lines<'e, E>(&self, executor: E, check_id: Uuid) -> Result<Vec<InventoryCheckLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, InventoryCheckLine>(
            r#"
            SELECT l.*
            FROM inventory_check_lines l
            JOIN vessel_inventory_requirements r ON r.id = l.requirement_id
            LEFT JOIN inventory_groups g ON g.id = r.parent_group_id
            WHERE l.inventory_check_id = $1
            ORDER BY g.sort_order ASC NULLS LAST, r.sort_order ASC, r.created_at ASC
            "#,
        )
        .bind(check_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn upsert_check_line<'e, E>(
        &self,
        executor: E,
        check_id: Uuid,
        requirement_id: Uuid,
        actual_quantity: i32,
        condition: CheckLineCondition,
        notes: Option<&str>,
    ) -> Result<InventoryCheckLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, InventoryCheckLine>(
            r#"
            INSERT INTO inventory_check_lines (
                inventory_check_id, requirement_id, actual_quantity, condition, notes, counted_at
            )
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT ON CONSTRAINT uq_inventory_check_lines_check_requirement
            DO UPDATE SET
                actual_quantity = EXCLUDED.actual_quantity,
                condition = EXCLUDED.condition,
                notes = EXCLUDED.notes,
                counted_at = now(),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(check_id)
        .bind(requirement_id)
        .bind(actual_quantity)
        .bind(condition)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(line)
    }

    pub async fn update_check_line<'e, E>(
        &self,
        executor: E,
        check_id: Uuid,
        line_id: Uuid,
        actual_quantity: Option<i32>,
        condition: Option<CheckLineCondition>,
        notes: Option<&str>,
    ) -> Result<Option<InventoryCheckLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, InventoryCheckLine>(
            r#"
            UPDATE inventory_check_lines
            SET actual_quantity = COALESCE($3, actual_quantity),
                condition = COALESCE($4, condition),
                notes = COALESCE($5, notes),
                counted_at = CASE WHEN $3::int IS NULL THEN counted_at ELSE now() END,
                updated_at = now()
            WHERE id = $2 AND inventory_check_id = $1
            RETURNING *
            "#,
        )
        .bind(check_id)
        .bind(line_id)
        .bind(actual_quantity)
        .bind(condition)
        .bind(notes)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    /// Linhas contadas + estoque atual, travando os itens. Linhas que ficaram
    /// com a quantidade pré-carregada não entram: o estoque pode ter mudado
    /// (viagens) depois da abertura.
    pub async fn lines_to_reconcile<'e, E>(&self, executor: E, check_id: Uuid) -> Result<Vec<LineToReconcile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, LineToReconcile>(
            r#"
            SELECT l.requirement_id, l.actual_quantity, r.current_quantity
            FROM inventory_check_lines l
            JOIN vessel_inventory_requirements r ON r.id = l.requirement_id
            WHERE l.inventory_check_id = $1 AND l.counted_at IS NOT NULL
            ORDER BY r.id
            FOR UPDATE OF r
            "#,
        )
        .bind(check_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn set_check_status<'e, E>(
        &self,
        executor: E,
        check_id: Uuid,
        status: InventoryCheckStatus,
    ) -> Result<InventoryCheck, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let check = sqlx::query_as::<_, InventoryCheck>(
            "UPDATE inventory_checks SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(check_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(check)
    }
}
