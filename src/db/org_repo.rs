// src/db/org_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::organization::{
        AdminOrgSummary, MemberView, MembershipStatus, OrgInvite, OrgMembership, OrgRequestStatus,
        OrgRole, Organization, OrganizationRequest, OrganizationRequestView,
    },
};

/// Dados de assinatura vindos do provedor de cobrança.
#[derive(Debug, Clone)]
pub struct SubscriptionSync<'a> {
    pub customer_id: Option<&'a str>,
    pub subscription_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub plan: Option<&'a str>,
    pub addon_pack_quantity: i32,
    pub vessel_limit: Option<i32>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OrgRepository {
    pool: PgPool,
}

impl OrgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  1. ORGANIZAÇÕES
    // =========================================================================

    pub async fn create_org<'e, E>(&self, executor: E, name: &str) -> Result<Organization, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let org = sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(executor)
        .await?;
        Ok(org)
    }

    pub async fn find_org<'e, E>(&self, executor: E, org_id: Uuid) -> Result<Option<Organization>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(executor)
            .await?;
        Ok(org)
    }

    /// Já criou (ADMIN) ou participa (ACTIVE) de uma organização com este nome?
    pub async fn user_has_org_named<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        name: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM organizations o
                JOIN org_memberships m ON m.org_id = o.id
                WHERE m.user_id = $1
                  AND o.name = $2
                  AND (m.role = 'ADMIN' OR m.status = 'ACTIVE')
            )
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Organizações onde o usuário é membro ACTIVE.
    pub async fn list_orgs_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        let orgs = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.*
            FROM organizations o
            JOIN org_memberships m ON m.org_id = o.id
            WHERE m.user_id = $1 AND m.status = 'ACTIVE'
            ORDER BY o.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }

    pub async fn list_all_orgs(&self) -> Result<Vec<AdminOrgSummary>, AppError> {
        let orgs = sqlx::query_as::<_, AdminOrgSummary>(
            r#"
            SELECT o.*,
                (SELECT COUNT(*) FROM org_memberships m WHERE m.org_id = o.id AND m.status = 'ACTIVE') AS member_count,
                (SELECT COUNT(*) FROM vessels v WHERE v.org_id = o.id) AS vessel_count
            FROM organizations o
            ORDER BY o.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }

    pub async fn toggle_active(&self, org_id: Uuid) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET is_active = NOT is_active, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    pub async fn set_billing_override(
        &self,
        org_id: Uuid,
        enabled: bool,
        vessel_limit: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET billing_override_enabled = $2,
                billing_override_vessel_limit = $3,
                billing_override_expires_at = $4,
                billing_override_reason = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(enabled)
        .bind(vessel_limit)
        .bind(expires_at)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    // --- Cobrança ---

    pub async fn find_by_stripe_customer(&self, customer_id: &str) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE stripe_customer_id = $1 LIMIT 1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    pub async fn set_stripe_customer(&self, org_id: Uuid, customer_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE organizations SET stripe_customer_id = $2, updated_at = now() WHERE id = $1")
            .bind(org_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn apply_subscription(
        &self,
        org_id: Uuid,
        sync: &SubscriptionSync<'_>,
    ) -> Result<Organization, AppError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET stripe_customer_id = COALESCE($2, stripe_customer_id),
                stripe_subscription_id = $3,
                subscription_status = $4,
                subscription_plan = $5,
                addon_pack_quantity = $6,
                vessel_limit = $7,
                current_period_end = COALESCE($8, current_period_end),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(sync.customer_id)
        .bind(sync.subscription_id)
        .bind(sync.status)
        .bind(sync.plan)
        .bind(sync.addon_pack_quantity)
        .bind(sync.vessel_limit)
        .bind(sync.current_period_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(org)
    }

    /// Assinatura cancelada: limpa os campos e marca 'canceled'.
    pub async fn clear_subscription(&self, org_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE organizations
            SET stripe_subscription_id = NULL,
                subscription_status = 'canceled',
                subscription_plan = NULL,
                vessel_limit = NULL,
                current_period_end = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // =========================================================================
    //  2. ASSOCIAÇÕES (MEMBERSHIPS)
    // =========================================================================

    pub async fn find_membership<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, OrgMembership>(
            "SELECT * FROM org_memberships WHERE org_id = $1 AND user_id = $2",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(membership)
    }

    pub async fn create_membership<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
        status: MembershipStatus,
    ) -> Result<OrgMembership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, OrgMembership>(
            r#"
            INSERT INTO org_memberships (org_id, user_id, role, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role)
        .bind(status)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::AlreadyMember;
                }
            }
            e.into()
        })
    }

    pub async fn update_membership<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        user_id: Uuid,
        role: Option<OrgRole>,
        status: Option<MembershipStatus>,
    ) -> Result<Option<OrgMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, OrgMembership>(
            r#"
            UPDATE org_memberships
            SET role = COALESCE($3, role),
                status = COALESCE($4, status),
                updated_at = now()
            WHERE org_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(membership)
    }

    pub async fn list_members(&self, org_id: Uuid) -> Result<Vec<MemberView>, AppError> {
        let members = sqlx::query_as::<_, MemberView>(
            r#"
            SELECT m.id, m.org_id, m.user_id, m.role, m.status, u.email, u.name, m.created_at
            FROM org_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.org_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn user_has_active_membership<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM org_memberships WHERE user_id = $1 AND status = 'ACTIVE')",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn email_has_membership<'e, E>(&self, executor: E, org_id: Uuid, email: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM org_memberships m
                JOIN users u ON u.id = m.user_id
                WHERE m.org_id = $1 AND lower(u.email) = lower($2)
            )
            "#,
        )
        .bind(org_id)
        .bind(email)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    // =========================================================================
    //  3. CONVITES
    // =========================================================================

    pub async fn create_invite<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        email: &str,
        role: OrgRole,
        token: &str,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<OrgInvite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, OrgInvite>(
            r#"
            INSERT INTO org_invites (org_id, email, role, token, invited_by_user_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(email)
        .bind(role)
        .bind(token)
        .bind(invited_by)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(invite)
    }

    /// Pendente = não aceito, não revogado e ainda válido.
    pub async fn has_pending_invite<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM org_invites
                WHERE org_id = $1
                  AND lower(email) = lower($2)
                  AND accepted_at IS NULL
                  AND revoked_at IS NULL
                  AND expires_at > $3
            )
            "#,
        )
        .bind(org_id)
        .bind(email)
        .bind(now)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn list_pending_invites(&self, org_id: Uuid, now: DateTime<Utc>) -> Result<Vec<OrgInvite>, AppError> {
        let invites = sqlx::query_as::<_, OrgInvite>(
            r#"
            SELECT * FROM org_invites
            WHERE org_id = $1 AND accepted_at IS NULL AND revoked_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(org_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    /// Busca pelo token travando a linha (aceite concorrente).
    pub async fn find_invite_by_token_for_update<'e, E>(
        &self,
        executor: E,
        token: &str,
    ) -> Result<Option<OrgInvite>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, OrgInvite>(
            "SELECT * FROM org_invites WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(invite)
    }

    pub async fn mark_invite_accepted<'e, E>(&self, executor: E, invite_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE org_invites SET accepted_at = $2 WHERE id = $1")
            .bind(invite_id)
            .bind(at)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Revoga um convite ainda não aceito. Revogar de novo mantém a data original.
    pub async fn revoke_invite(&self, org_id: Uuid, invite_id: Uuid) -> Result<Option<OrgInvite>, AppError> {
        let invite = sqlx::query_as::<_, OrgInvite>(
            r#"
            UPDATE org_invites
            SET revoked_at = COALESCE(revoked_at, now())
            WHERE id = $1 AND org_id = $2 AND accepted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(invite_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invite)
    }

    // =========================================================================
    //  4. SOLICITAÇÕES DE ORGANIZAÇÃO
    // =========================================================================

    pub async fn has_pending_request<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM organization_requests WHERE requested_by_user_id = $1 AND status = 'PENDING')",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn create_request(&self, user_id: Uuid, org_name: &str) -> Result<OrganizationRequest, AppError> {
        let request = sqlx::query_as::<_, OrganizationRequest>(
            r#"
            INSERT INTO organization_requests (requested_by_user_id, org_name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(org_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    pub async fn list_requests(&self, status: Option<OrgRequestStatus>) -> Result<Vec<OrganizationRequestView>, AppError> {
        let requests = sqlx::query_as::<_, OrganizationRequestView>(
            r#"
            SELECT r.*, u.email AS requester_email, u.name AS requester_name
            FROM organization_requests r
            JOIN users u ON u.id = r.requested_by_user_id
            WHERE ($1::org_request_status IS NULL OR r.status = $1)
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn find_request_for_update<'e, E>(
        &self,
        executor: E,
        request_id: Uuid,
    ) -> Result<Option<OrganizationRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, OrganizationRequest>(
            "SELECT * FROM organization_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }

    pub async fn resolve_request<'e, E>(
        &self,
        executor: E,
        request_id: Uuid,
        status: OrgRequestStatus,
        reviewer_id: Uuid,
        review_notes: Option<&str>,
        created_org_id: Option<Uuid>,
    ) -> Result<OrganizationRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, OrganizationRequest>(
            r#"
            UPDATE organization_requests
            SET status = $2,
                reviewed_by_user_id = $3,
                review_notes = $4,
                reviewed_at = now(),
                created_org_id = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(status)
        .bind(reviewer_id)
        .bind(review_notes)
        .bind(created_org_id)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn find_request_view(&self, request_id: Uuid) -> Result<Option<OrganizationRequestView>, AppError> {
        let request = sqlx::query_as::<_, OrganizationRequestView>(
            r#"
            SELECT r.*, u.email AS requester_email, u.name AS requester_name
            FROM organization_requests r
            JOIN users u ON u.id = r.requested_by_user_id
            WHERE r.id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }
}
