// src/services/vessel_service.rs

use chrono::Utc;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::VesselLimitPolicy,
    db::{
        vessel_repo::{VesselFields, VesselPatch},
        OrgRepository, VesselRepository,
    },
    middleware::tenancy::OrgContext,
    models::vessel::{CommentView, Vessel},
    rules::entitlement::{capacity_for_new_vessel, effective_vessel_limit, Capacity, PlanPricing},
};

/// Embarcação do tenant ou 404. Compartilhado pelos serviços que trabalham "dentro" de uma embarcação.
pub async fn require_vessel<'e, E>(
    vessel_repo: &VesselRepository,
    executor: E,
    ctx: &OrgContext,
    vessel_id: Uuid,
) -> Result<Vessel, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    vessel_repo
        .find(executor, ctx.org_id, vessel_id)
        .await?
        .ok_or(AppError::NotFound("vessel"))
}

#[derive(Clone)]
pub struct VesselService {
    pool: PgPool,
    vessel_repo: VesselRepository,
    org_repo: OrgRepository,
    pricing: PlanPricing,
    limit_policy: VesselLimitPolicy,
}

impl VesselService {
    pub fn new(
        pool: PgPool,
        vessel_repo: VesselRepository,
        org_repo: OrgRepository,
        pricing: PlanPricing,
        limit_policy: VesselLimitPolicy,
    ) -> Self {
        Self { pool, vessel_repo, org_repo, pricing, limit_policy }
    }

    pub async fn list(&self, ctx: &OrgContext) -> Result<Vec<Vessel>, AppError> {
        self.vessel_repo.list(ctx.org_id).await
    }

    pub async fn get(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vessel, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await
    }

    pub async fn create(&self, ctx: &OrgContext, name: &str, fields: &VesselFields<'_>) -> Result<Vessel, AppError> {
        let mut tx = self.pool.begin().await?;

        let org = self
            .org_repo
            .find_org(&mut *tx, ctx.org_id)
            .await?
            .ok_or(AppError::NotFound("organization"))?;
        let count = self.vessel_repo.count_for_org(&mut *tx, ctx.org_id).await?;
        let limit = effective_vessel_limit(&org, self.pricing, Utc::now());

        if let Capacity::Exhausted { limit } = capacity_for_new_vessel(limit, count) {
            match self.limit_policy {
                VesselLimitPolicy::Reject => return Err(AppError::VesselLimitReached(limit)),
                VesselLimitPolicy::Report => tracing::warn!(
                    "⚠️ Organização {} acima do limite de embarcações ({} de {})",
                    ctx.org_id,
                    count + 1,
                    limit
                ),
            }
        }

        let vessel = self.vessel_repo.create(&mut *tx, ctx.org_id, name, fields).await?;
        tx.commit().await?;
        Ok(vessel)
    }

    pub async fn update(&self, ctx: &OrgContext, vessel_id: Uuid, patch: &VesselPatch<'_>) -> Result<Vessel, AppError> {
        self.vessel_repo
            .update(ctx.org_id, vessel_id, patch)
            .await?
            .ok_or(AppError::NotFound("vessel"))
    }

    pub async fn delete(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<(), AppError> {
        if self.vessel_repo.delete(ctx.org_id, vessel_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("vessel"))
        }
    }

    // --- Comentários ---

    pub async fn list_comments(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<Vec<CommentView>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        self.vessel_repo.list_comments(vessel_id).await
    }

    pub async fn add_comment(&self, ctx: &OrgContext, vessel_id: Uuid, body: &str) -> Result<CommentView, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        let comment = self
            .vessel_repo
            .create_comment(vessel_id, ctx.user.id, body.trim())
            .await?;

        Ok(CommentView {
            comment,
            author_name: ctx.user.name.clone(),
            author_email: ctx.user.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::organization::OrgRole, services::test_support::seed_vessel};

    fn service(pool: &PgPool) -> VesselService {
        VesselService::new(
            pool.clone(),
            VesselRepository::new(pool.clone()),
            OrgRepository::new(pool.clone()),
            PlanPricing::default(),
            VesselLimitPolicy::Report,
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn vessels_of_another_org_are_not_found(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let other = OrgRepository::new(pool.clone())
            .create_org(&pool, "Harbor Patrol")
            .await
            .expect("org");
        let outsider = OrgContext { user: ctx.user.clone(), org_id: other.id, role: OrgRole::Admin };

        assert!(matches!(service(&pool).get(&outsider, vessel.id).await, Err(AppError::NotFound("vessel"))));
        assert!(matches!(service(&pool).delete(&outsider, vessel.id).await, Err(AppError::NotFound("vessel"))));
        assert!(service(&pool).list(&outsider).await.expect("list").is_empty());

        assert_eq!(service(&pool).get(&ctx, vessel.id).await.expect("own vessel").id, vessel.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn patch_clears_nullable_fields_with_null(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);

        let updated = service
            .update(
                &ctx,
                vessel.id,
                &VesselPatch { make: Some(Some("Beneteau")), year: Some(Some(2015)), ..Default::default() },
            )
            .await
            .expect("set");
        assert_eq!(updated.make.as_deref(), Some("Beneteau"));

        let cleared = service
            .update(&ctx, vessel.id, &VesselPatch { make: Some(None), ..Default::default() })
            .await
            .expect("clear");
        assert_eq!(cleared.make, None);
        assert_eq!(cleared.year, Some(2015));
        assert_eq!(cleared.name, "Sea Breeze");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn comment_list_is_newest_first_and_stable(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);
        for body in ["Hull cleaned", "Bow thruster noisy", "New fenders aboard"] {
            service.add_comment(&ctx, vessel.id, body).await.expect("comment");
        }

        let bodies = |comments: Vec<CommentView>| comments.into_iter().map(|c| c.comment.body).collect::<Vec<_>>();
        let first = bodies(service.list_comments(&ctx, vessel.id).await.expect("first"));
        let second = bodies(service.list_comments(&ctx, vessel.id).await.expect("second"));
        assert_eq!(first, vec!["New fenders aboard", "Bow thruster noisy", "Hull cleaned"]);
        assert_eq!(first, second);
    }
}
