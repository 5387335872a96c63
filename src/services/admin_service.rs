// src/services/admin_service.rs
//
// Ações de plataforma (super admin).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrgRepository, UserRepository},
    models::{
        auth::User,
        organization::{
            AdminOrgSummary, MembershipStatus, OrgRequestStatus, OrgRole, Organization,
            OrganizationRequestView,
        },
    },
    rules::RuleError,
};

#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
    org_repo: OrgRepository,
    user_repo: UserRepository,
}

impl AdminService {
    pub fn new(pool: PgPool, org_repo: OrgRepository, user_repo: UserRepository) -> Self {
        Self { pool, org_repo, user_repo }
    }

    pub async fn list_orgs(&self) -> Result<Vec<AdminOrgSummary>, AppError> {
        self.org_repo.list_all_orgs().await
    }

    pub async fn toggle_org_status(&self, org_id: Uuid) -> Result<Organization, AppError> {
        let org = self
            .org_repo
            .toggle_active(org_id)
            .await?
            .ok_or(AppError::NotFound("organization"))?;
        tracing::info!("Organização {} agora is_active={}", org.id, org.is_active);
        Ok(org)
    }

    pub async fn set_billing_override(
        &self,
        org_id: Uuid,
        enabled: bool,
        vessel_limit: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<Organization, AppError> {
        self.org_repo
            .set_billing_override(org_id, enabled, vessel_limit, expires_at, reason)
            .await?
            .ok_or(AppError::NotFound("organization"))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_all().await
    }

    pub async fn list_requests(&self, status: Option<OrgRequestStatus>) -> Result<Vec<OrganizationRequestView>, AppError> {
        self.org_repo.list_requests(status).await
    }

    /// Aprovar cria a organização e a associação ADMIN do solicitante na mesma transação.
    pub async fn review_request(
        &self,
        reviewer: &User,
        request_id: Uuid,
        status: OrgRequestStatus,
        review_notes: Option<&str>,
    ) -> Result<OrganizationRequestView, AppError> {
        if status == OrgRequestStatus::Pending {
            return Err(RuleError::new("status", "invalid_review_status").into());
        }

        let mut tx = self.pool.begin().await?;

        let request = self
            .org_repo
            .find_request_for_update(&mut *tx, request_id)
            .await?
            .ok_or(AppError::NotFound("org_request"))?;

        if request.status != OrgRequestStatus::Pending {
            return Err(AppError::RequestAlreadyReviewed);
        }

        let created_org_id = if status == OrgRequestStatus::Approved {
            let org = self.org_repo.create_org(&mut *tx, &request.org_name).await?;
            self.org_repo
                .create_membership(
                    &mut *tx,
                    org.id,
                    request.requested_by_user_id,
                    OrgRole::Admin,
                    MembershipStatus::Active,
                )
                .await?;
            Some(org.id)
        } else {
            None
        };

        self.org_repo
            .resolve_request(&mut *tx, request_id, status, reviewer.id, review_notes, created_org_id)
            .await?;

        tx.commit().await?;
        tracing::info!("Solicitação {} analisada: {:?}", request_id, status);

        self.org_repo
            .find_request_view(request_id)
            .await?
            .ok_or(AppError::NotFound("org_request"))
    }
}
