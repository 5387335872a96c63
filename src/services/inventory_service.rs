// src/services/inventory_service.rs

use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        inventory_repo::{NewAdjustment, NewRequirement, RequirementPatch},
        InventoryRepository, VesselRepository,
    },
    middleware::tenancy::OrgContext,
    models::inventory::{
        CheckLineCondition, InventoryAdjustment, InventoryCheck, InventoryCheckDetail,
        InventoryCheckLine, InventoryCheckStatus, InventoryGroup, InventoryRequirement,
        RequirementHistoryEntry, REASON_CHECK, REASON_MANUAL,
    },
    rules::{
        consumption::{manual_adjustment, reconcile_to_count},
        ordering::{next_sort_order, plan_reorder},
        RuleError,
    },
    services::vessel_service::require_vessel,
};

/// Dados de um novo item; vessel e posição são definidos pelo serviço.
pub struct RequirementDraft<'a> {
    pub parent_group_id: Option<Uuid>,
    pub item_name: &'a str,
    pub required_quantity: i32,
    pub category: Option<&'a str>,
    pub critical: bool,
    pub notes: Option<&'a str>,
    pub current_quantity: i32,
    pub auto_consume_enabled: bool,
    pub consume_per_hour: Option<rust_decimal::Decimal>,
}

pub struct CheckLineInput {
    pub requirement_id: Uuid,
    pub actual_quantity: i32,
    pub condition: CheckLineCondition,
    pub notes: Option<String>,
}

fn ensure_editable(check: &InventoryCheck) -> Result<(), AppError> {
    if check.status == InventoryCheckStatus::InProgress {
        Ok(())
    } else {
        Err(AppError::CheckNotEditable)
    }
}

#[derive(Clone)]
pub struct InventoryService {
    pool: PgPool,
    inventory_repo: InventoryRepository,
    vessel_repo: VesselRepository,
}

impl InventoryService {
    pub fn new(pool: PgPool, inventory_repo: InventoryRepository, vessel_repo: VesselRepository) -> Self {
        Self { pool, inventory_repo, vessel_repo }
    }

    // =========================================================================
    //  1. GRUPOS
    // =========================================================================

    pub async fn list_groups(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vec<InventoryGroup>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        self.inventory_repo.list_groups(vessel_id).await
    }

    pub async fn create_group(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<InventoryGroup, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        let max = self.inventory_repo.max_group_sort_order(&mut *tx, vessel_id).await?;
        let group = self
            .inventory_repo
            .create_group(&mut *tx, vessel_id, name.trim(), description, next_sort_order(max))
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    async fn require_group(&self, ctx: &OrgContext, group_id: Uuid) -> Result<InventoryGroup, AppError> {
        self.inventory_repo
            .find_group_in_org(&self.pool, ctx.org_id, group_id)
            .await?
            .ok_or(AppError::NotFound("inventory_group"))
    }

    pub async fn update_group(
        &self,
        ctx: &OrgContext,
        group_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<InventoryGroup, AppError> {
        self.require_group(ctx, group_id).await?;
        self.inventory_repo
            .update_group(group_id, name.map(str::trim), description)
            .await
    }

    /// Os itens do grupo ficam sem grupo (FK ON DELETE SET NULL).
    pub async fn delete_group(&self, ctx: &OrgContext, group_id: Uuid) -> Result<(), AppError> {
        self.require_group(ctx, group_id).await?;
        self.inventory_repo.delete_group(group_id).await
    }

    pub async fn reorder_groups(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<InventoryGroup>, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        let existing = self.inventory_repo.group_ids(&mut *tx, vessel_id).await?;
        let plan = plan_reorder("group_ids", &existing, group_ids)?;
        for (group_id, position) in plan {
            self.inventory_repo
                .set_group_sort_order(&mut *tx, group_id, position)
                .await?;
        }

        tx.commit().await?;
        self.inventory_repo.list_groups(vessel_id).await
    }

    // =========================================================================
    //  2. ITENS EXIGIDOS
    // =========================================================================

    pub async fn list_requirements(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vec<InventoryRequirement>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        self.inventory_repo.list_requirements(&self.pool, vessel_id).await
    }

    pub async fn create_requirement(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        draft: &RequirementDraft<'_>,
    ) -> Result<InventoryRequirement, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        if let Some(group_id) = draft.parent_group_id {
            if !self.inventory_repo.group_belongs_to_vessel(&mut *tx, vessel_id, group_id).await? {
                return Err(AppError::NotFound("inventory_group"));
            }
        }

        // Posição dentro do mesmo grupo (ou entre os sem grupo)
        let max = self
            .inventory_repo
            .max_requirement_sort_order(&mut *tx, vessel_id, draft.parent_group_id)
            .await?;

        let new = NewRequirement {
            vessel_id,
            parent_group_id: draft.parent_group_id,
            item_name: draft.item_name.trim(),
            required_quantity: draft.required_quantity,
            category: draft.category,
            critical: draft.critical,
            notes: draft.notes,
            sort_order: next_sort_order(max),
            current_quantity: draft.current_quantity,
            auto_consume_enabled: draft.auto_consume_enabled,
            consume_per_hour: draft.consume_per_hour,
        };
        let requirement = self.inventory_repo.create_requirement(&mut *tx, &new).await?;

        tx.commit().await?;
        Ok(requirement)
    }

    async fn require_requirement(&self, ctx: &OrgContext, requirement_id: Uuid) -> Result<InventoryRequirement, AppError> {
        self.inventory_repo
            .find_requirement_in_org(&self.pool, ctx.org_id, requirement_id)
            .await?
            .ok_or(AppError::NotFound("requirement"))
    }

    pub async fn update_requirement(
        &self,
        ctx: &OrgContext,
        requirement_id: Uuid,
        patch: &RequirementPatch<'_>,
    ) -> Result<InventoryRequirement, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .inventory_repo
            .find_requirement_in_org(&mut *tx, ctx.org_id, requirement_id)
            .await?
            .ok_or(AppError::NotFound("requirement"))?;

        if let Some(Some(group_id)) = patch.parent_group_id {
            if !self
                .inventory_repo
                .group_belongs_to_vessel(&mut *tx, current.vessel_id, group_id)
                .await?
            {
                return Err(AppError::NotFound("inventory_group"));
            }
        }

        let requirement = self
            .inventory_repo
            .update_requirement(&mut *tx, requirement_id, patch)
            .await?;

        tx.commit().await?;
        Ok(requirement)
    }

    pub async fn delete_requirement(&self, ctx: &OrgContext, requirement_id: Uuid) -> Result<(), AppError> {
        self.require_requirement(ctx, requirement_id).await?;
        self.inventory_repo.delete_requirement(requirement_id).await
    }

    /// Reordena os itens de um grupo (`None` = itens sem grupo).
    pub async fn reorder_requirements(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        group_id: Option<Uuid>,
        item_ids: &[Uuid],
    ) -> Result<Vec<InventoryRequirement>, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        if let Some(group_id) = group_id {
            if !self.inventory_repo.group_belongs_to_vessel(&mut *tx, vessel_id, group_id).await? {
                return Err(AppError::NotFound("inventory_group"));
            }
        }

        let existing = self
            .inventory_repo
            .requirement_ids_in_group(&mut *tx, vessel_id, group_id)
            .await?;
        let plan = plan_reorder("item_ids", &existing, item_ids)?;
        for (requirement_id, position) in plan {
            self.inventory_repo
                .set_requirement_sort_order(&mut *tx, requirement_id, position)
                .await?;
        }

        let requirements = self.inventory_repo.list_requirements(&mut *tx, vessel_id).await?;
        tx.commit().await?;
        Ok(requirements)
    }

    pub async fn history(&self, ctx: &OrgContext, requirement_id: Uuid) -> Result<Vec<RequirementHistoryEntry>, AppError> {
        self.require_requirement(ctx, requirement_id).await?;
        self.inventory_repo.list_history(requirement_id).await
    }

    // =========================================================================
    //  3. AJUSTES
    // =========================================================================

    pub async fn list_adjustments(&self, ctx: &OrgContext, requirement_id: Uuid) -> Result<Vec<InventoryAdjustment>, AppError> {
        self.require_requirement(ctx, requirement_id).await?;
        self.inventory_repo.list_adjustments(requirement_id).await
    }

    pub async fn adjust_stock(
        &self,
        ctx: &OrgContext,
        requirement_id: Uuid,
        delta: i32,
        note: Option<&str>,
    ) -> Result<InventoryAdjustment, AppError> {
        let mut tx = self.pool.begin().await?;

        let requirement = self
            .inventory_repo
            .find_requirement_for_update(&mut *tx, ctx.org_id, requirement_id)
            .await?
            .ok_or(AppError::NotFound("requirement"))?;

        let change = manual_adjustment(requirement.current_quantity, delta)?;

        let adjustment = self
            .inventory_repo
            .insert_adjustment(
                &mut *tx,
                &NewAdjustment {
                    requirement_id,
                    reason: REASON_MANUAL,
                    reference_trip_id: None,
                    change,
                    note,
                    created_by_user_id: ctx.user.id,
                },
            )
            .await?;
        self.inventory_repo
            .set_current_quantity(&mut *tx, requirement_id, change.after_qty)
            .await?;

        tx.commit().await?;
        Ok(adjustment)
    }

    // =========================================================================
    //  4. CONFERÊNCIAS
    // =========================================================================

    /// Abre uma conferência com uma linha por item, já com a quantidade atual.
    pub async fn start_check(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        notes: Option<&str>,
    ) -> Result<InventoryCheckDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        let check = self
            .inventory_repo
            .create_check(&mut *tx, vessel_id, ctx.user.id, notes)
            .await?;
        self.inventory_repo.seed_check_lines(&mut *tx, check.id, vessel_id).await?;
        let lines = self.inventory_repo.list_check_lines(&mut *tx, check.id).await?;

        tx.commit().await?;
        Ok(InventoryCheckDetail { check, lines })
    }

    pub async fn list_checks(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vec<InventoryCheck>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        self.inventory_repo.list_checks(vessel_id).await
    }

    pub async fn get_check(&self, ctx: &OrgContext, check_id: Uuid) -> Result<InventoryCheckDetail, AppError> {
        let check = self
            .inventory_repo
            .find_check_in_org(&self.pool, ctx.org_id, check_id, false)
            .await?
            .ok_or(AppError::NotFound("inventory_check"))?;
        let lines = self.inventory_repo.list_check_lines(&self.pool, check_id).await?;
        Ok(InventoryCheckDetail { check, lines })
    }

    pub async fn upsert_lines(
        &self,
        ctx: &OrgContext,
        check_id: Uuid,
        lines: &[CheckLineInput],
    ) -> Result<InventoryCheckDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let check = self
            .inventory_repo
            .find_check_in_org(&mut *tx, ctx.org_id, check_id, true)
            .await?
            .ok_or(AppError::NotFound("inventory_check"))?;
        ensure_editable(&check)?;

        let vessel_items: HashSet<Uuid> = self
            .inventory_repo
            .list_requirements(&mut *tx, check.vessel_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        for line in lines {
            if !vessel_items.contains(&line.requirement_id) {
                return Err(RuleError::new("lines", "requirement_not_in_vessel").into());
            }
            self.inventory_repo
                .upsert_check_line(
                    &mut *tx,
                    check_id,
                    line.requirement_id,
                    line.actual_quantity,
                    line.condition,
                    line.notes.as_deref(),
                )
                .await?;
        }

        let lines = self.inventory_repo.list_check_lines(&mut *tx, check_id).await?;
        tx.commit().await?;
        Ok(InventoryCheckDetail { check, lines })
    }

    pub async fn update_line(
        &self,
        ctx: &OrgContext,
        check_id: Uuid,
        line_id: Uuid,
        actual_quantity: Option<i32>,
        condition: Option<CheckLineCondition>,
        notes: Option<&str>,
    ) -> Result<InventoryCheckLine, AppError> {
        let mut tx = self.pool.begin().await?;

        let check = self
            .inventory_repo
            .find_check_in_org(&mut *tx, ctx.org_id, check_id, true)
            .await?
            .ok_or(AppError::NotFound("inventory_check"))?;
        ensure_editable(&check)?;

        let line = self
            .inventory_repo
            .update_check_line(&mut *tx, check_id, line_id, actual_quantity, condition, notes)
            .await?
            .ok_or(AppError::NotFound("check_line"))?;

        tx.commit().await?;
        Ok(line)
    }

    /// Fecha a conferência e acerta o estoque com o que foi contado.
    pub async fn submit_check(&self, ctx: &OrgContext, check_id: Uuid) -> Result<InventoryCheckDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let check = self
            .inventory_repo
            .find_check_in_org(&mut *tx, ctx.org_id, check_id, true)
            .await?
            .ok_or(AppError::NotFound("inventory_check"))?;
        ensure_editable(&check)?;

        let mut reconciled = 0;
        for line in self.inventory_repo.lines_to_reconcile(&mut *tx, check_id).await? {
            let Some(change) = reconcile_to_count(line.current_quantity, line.actual_quantity) else {
                continue;
            };
            self.inventory_repo
                .insert_adjustment(
                    &mut *tx,
                    &NewAdjustment {
                        requirement_id: line.requirement_id,
                        reason: REASON_CHECK,
                        reference_trip_id: None,
                        change,
                        note: None,
                        created_by_user_id: ctx.user.id,
                    },
                )
                .await?;
            self.inventory_repo
                .set_current_quantity(&mut *tx, line.requirement_id, change.after_qty)
                .await?;
            reconciled += 1;
        }

        let check = self
            .inventory_repo
            .set_check_status(&mut *tx, check_id, InventoryCheckStatus::Submitted)
            .await?;
        let lines = self.inventory_repo.list_check_lines(&mut *tx, check_id).await?;

        tx.commit().await?;
        tracing::info!("📋 Conferência {} enviada: {} item(ns) ajustado(s)", check_id, reconciled);
        Ok(InventoryCheckDetail { check, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::TripRepository,
        services::{
            test_support::{seed_consumable, seed_vessel},
            trip_service::TripService,
        },
    };
    use rust_decimal::Decimal;

    fn service(pool: &PgPool) -> InventoryService {
        InventoryService::new(pool.clone(), InventoryRepository::new(pool.clone()), VesselRepository::new(pool.clone()))
    }

    fn trips(pool: &PgPool) -> TripService {
        TripService::new(
            pool.clone(),
            TripRepository::new(pool.clone()),
            VesselRepository::new(pool.clone()),
            InventoryRepository::new(pool.clone()),
        )
    }

    async fn stock_of(pool: &PgPool, ctx: &OrgContext, vessel_id: Uuid, requirement_id: Uuid) -> i32 {
        service(pool)
            .list_requirements(ctx, vessel_id)
            .await
            .expect("requirements")
            .into_iter()
            .find(|r| r.id == requirement_id)
            .expect("requirement")
            .current_quantity
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn untouched_check_lines_do_not_undo_trip_consumption(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let requirement = seed_consumable(&pool, &vessel, 10, Decimal::new(15, 1)).await;

        let check = service(&pool).start_check(&ctx, vessel.id, None).await.expect("check");
        assert_eq!(check.lines[0].actual_quantity, 10);
        assert_eq!(check.lines[0].counted_at, None);

        trips(&pool)
            .log_trip(&ctx, vessel.id, Decimal::from(4), None, None)
            .await
            .expect("trip");

        service(&pool).submit_check(&ctx, check.check.id).await.expect("submit");

        assert_eq!(stock_of(&pool, &ctx, vessel.id, requirement.id).await, 4);
        let reasons: Vec<String> = service(&pool)
            .list_adjustments(&ctx, requirement.id)
            .await
            .expect("adjustments")
            .into_iter()
            .map(|a| a.reason)
            .collect();
        assert_eq!(reasons, vec!["trip".to_string()]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn counted_lines_set_the_stock_on_submit(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let requirement = seed_consumable(&pool, &vessel, 10, Decimal::new(15, 1)).await;

        let check = service(&pool).start_check(&ctx, vessel.id, None).await.expect("check");
        let detail = service(&pool)
            .upsert_lines(
                &ctx,
                check.check.id,
                &[CheckLineInput {
                    requirement_id: requirement.id,
                    actual_quantity: 7,
                    condition: CheckLineCondition::Ok,
                    notes: None,
                }],
            )
            .await
            .expect("lines");
        assert!(detail.lines[0].counted_at.is_some());

        service(&pool).submit_check(&ctx, check.check.id).await.expect("submit");

        assert_eq!(stock_of(&pool, &ctx, vessel.id, requirement.id).await, 7);
        let adjustments = service(&pool).list_adjustments(&ctx, requirement.id).await.expect("adjustments");
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].reason, "check");
        assert_eq!((adjustments[0].delta, adjustments[0].before_qty, adjustments[0].after_qty), (-3, 10, 7));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn submitted_checks_are_read_only(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        seed_consumable(&pool, &vessel, 10, Decimal::new(15, 1)).await;

        let check = service(&pool).start_check(&ctx, vessel.id, None).await.expect("check");
        service(&pool).submit_check(&ctx, check.check.id).await.expect("submit");

        let line_id = check.lines[0].id;
        let result = service(&pool)
            .update_line(&ctx, check.check.id, line_id, Some(1), None, None)
            .await;
        assert!(matches!(result, Err(AppError::CheckNotEditable)));
    }
}
