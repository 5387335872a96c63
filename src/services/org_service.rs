// src/services/org_service.rs

use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrgRepository,
    integrations::mailer::{Email, Mailer},
    middleware::tenancy::OrgContext,
    models::{
        auth::User,
        organization::{
            MemberView, MembershipStatus, OrgInvite, OrgMembership, OrgRole, Organization,
            OrganizationRequest,
        },
    },
};

const INVITE_TOKEN_LEN: usize = 48;
const INVITE_TTL_DAYS: i64 = 7;

pub fn generate_invite_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn invite_email(to: &str, org_name: &str, web_base_url: &str, token: &str) -> Email {
    let invite_url = format!("{}/invite/{}", web_base_url, token);
    Email {
        to: to.to_string(),
        subject: format!("Invitation to join {} on dock-ops", org_name),
        html: format!(
            "<h2>You've been invited to join {org}</h2>\n\
             <p>Click the link below to accept your invitation:</p>\n\
             <p><a href=\"{url}\">{url}</a></p>\n\
             <p>This invitation will expire in {days} days.</p>",
            org = org_name,
            url = invite_url,
            days = INVITE_TTL_DAYS,
        ),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct OrgService {
    pool: PgPool,
    org_repo: OrgRepository,
    mailer: Arc<dyn Mailer>,
    web_base_url: String,
}

impl OrgService {
    pub fn new(pool: PgPool, org_repo: OrgRepository, mailer: Arc<dyn Mailer>, web_base_url: String) -> Self {
        Self { pool, org_repo, mailer, web_base_url }
    }

    /// Resolve o contexto do tenant. Associação ausente ou não-ACTIVE e
    /// organização inativa não passam.
    pub async fn resolve_context(&self, user: User, org_id: Uuid) -> Result<OrgContext, AppError> {
        let membership = self
            .org_repo
            .find_membership(&self.pool, org_id, user.id)
            .await?
            .filter(|m| m.status == MembershipStatus::Active)
            .ok_or(AppError::NotOrgMember)?;

        let org = self
            .org_repo
            .find_org(&self.pool, org_id)
            .await?
            .ok_or(AppError::NotOrgMember)?;

        if !org.is_active {
            return Err(AppError::OrgInactive);
        }

        Ok(OrgContext {
            user,
            org_id,
            role: membership.role,
        })
    }

    // --- Organizações ---

    pub async fn create_org(&self, user: &User, name: &str, force: bool) -> Result<Organization, AppError> {
        let name = name.trim();
        let mut tx = self.pool.begin().await?;

        if !force && self.org_repo.user_has_org_named(&mut *tx, user.id, name).await? {
            return Err(AppError::OrgNameAlreadyExists);
        }

        let org = self.org_repo.create_org(&mut *tx, name).await?;
        self.org_repo
            .create_membership(&mut *tx, org.id, user.id, OrgRole::Admin, MembershipStatus::Active)
            .await?;

        tx.commit().await?;
        tracing::info!("🏢 Organização {} criada por {}", org.id, user.id);
        Ok(org)
    }

    pub async fn list_my_orgs(&self, user: &User) -> Result<Vec<Organization>, AppError> {
        self.org_repo.list_orgs_for_user(user.id).await
    }

    pub async fn request_org(&self, user: &User, org_name: &str) -> Result<OrganizationRequest, AppError> {
        if !user.is_super_admin {
            if self.org_repo.has_pending_request(&self.pool, user.id).await? {
                return Err(AppError::PendingRequestExists);
            }
            if self.org_repo.user_has_active_membership(&self.pool, user.id).await? {
                return Err(AppError::AlreadyHasOrganization);
            }
        }

        self.org_repo.create_request(user.id, org_name.trim()).await
    }

    // --- Membros ---

    pub async fn list_members(&self, ctx: &OrgContext, org_id: Uuid) -> Result<Vec<MemberView>, AppError> {
        ctx.ensure_org(org_id)?;
        self.org_repo.list_members(org_id).await
    }

    pub async fn change_role(
        &self,
        ctx: &OrgContext,
        org_id: Uuid,
        target_user_id: Uuid,
        role: OrgRole,
    ) -> Result<OrgMembership, AppError> {
        ctx.ensure_org(org_id)?;
        if target_user_id == ctx.user.id {
            return Err(AppError::CannotModifySelf);
        }

        self.org_repo
            .update_membership(&self.pool, org_id, target_user_id, Some(role), None)
            .await?
            .ok_or(AppError::NotFound("member"))
    }

    pub async fn disable_member(
        &self,
        ctx: &OrgContext,
        org_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<OrgMembership, AppError> {
        ctx.ensure_org(org_id)?;
        if target_user_id == ctx.user.id {
            return Err(AppError::CannotModifySelf);
        }

        self.org_repo
            .update_membership(&self.pool, org_id, target_user_id, None, Some(MembershipStatus::Disabled))
            .await?
            .ok_or(AppError::NotFound("member"))
    }

    // --- Convites ---

    pub async fn create_invite(
        &self,
        ctx: &OrgContext,
        org_id: Uuid,
        email: &str,
        role: OrgRole,
    ) -> Result<OrgInvite, AppError> {
        ctx.ensure_org(org_id)?;
        let email = normalize_email(email);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if self.org_repo.email_has_membership(&mut *tx, org_id, &email).await? {
            return Err(AppError::AlreadyMember);
        }
        if self.org_repo.has_pending_invite(&mut *tx, org_id, &email, now).await? {
            return Err(AppError::PendingInviteExists);
        }

        let token = generate_invite_token();
        let invite = self
            .org_repo
            .create_invite(
                &mut *tx,
                org_id,
                &email,
                role,
                &token,
                ctx.user.id,
                now + Duration::days(INVITE_TTL_DAYS),
            )
            .await?;

        let org = self
            .org_repo
            .find_org(&mut *tx, org_id)
            .await?
            .ok_or(AppError::NotFound("organization"))?;

        tx.commit().await?;

        // Fora da transação: falha no e-mail não desfaz o convite.
        let message = invite_email(&invite.email, &org.name, &self.web_base_url, &token);
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                tracing::warn!("Falha ao enviar convite para {}: {}", message.to, e);
            }
        });

        Ok(invite)
    }

    pub async fn list_invites(&self, ctx: &OrgContext, org_id: Uuid) -> Result<Vec<OrgInvite>, AppError> {
        ctx.ensure_org(org_id)?;
        self.org_repo.list_pending_invites(org_id, Utc::now()).await
    }

    pub async fn revoke_invite(&self, ctx: &OrgContext, org_id: Uuid, invite_id: Uuid) -> Result<OrgInvite, AppError> {
        ctx.ensure_org(org_id)?;
        self.org_repo
            .revoke_invite(org_id, invite_id)
            .await?
            .ok_or(AppError::NotFound("invite"))
    }

    /// Aceite pelo token. Checagens em ordem: existe, já aceito, revogado,
    /// expirado, e-mail do convidado.
    pub async fn accept_invite(&self, user: &User, token: &str) -> Result<OrgMembership, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let invite = self
            .org_repo
            .find_invite_by_token_for_update(&mut *tx, token.trim())
            .await?
            .ok_or(AppError::NotFound("invite"))?;

        if invite.accepted_at.is_some() {
            return Err(AppError::InviteAlreadyAccepted);
        }
        if invite.revoked_at.is_some() {
            return Err(AppError::InviteRevoked);
        }
        if invite.expires_at <= now {
            return Err(AppError::InviteExpired);
        }
        if normalize_email(&invite.email) != normalize_email(&user.email) {
            return Err(AppError::InviteEmailMismatch);
        }

        let existing = self
            .org_repo
            .find_membership(&mut *tx, invite.org_id, user.id)
            .await?;

        let membership = match existing {
            Some(m) if m.status == MembershipStatus::Active => m,
            Some(_) => self
                .org_repo
                .update_membership(
                    &mut *tx,
                    invite.org_id,
                    user.id,
                    Some(invite.role),
                    Some(MembershipStatus::Active),
                )
                .await?
                .ok_or(AppError::NotFound("member"))?,
            None => {
                self.org_repo
                    .create_membership(&mut *tx, invite.org_id, user.id, invite.role, MembershipStatus::Active)
                    .await?
            }
        };

        self.org_repo.mark_invite_accepted(&mut *tx, invite.id, now).await?;
        tx.commit().await?;

        tracing::info!("✉️ Convite {} aceito por {}", invite.id, user.id);
        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::UserRepository, services::test_support::seed_vessel};

    #[test]
    fn invite_tokens_are_48_alphanumerics_and_unique() {
        let a = generate_invite_token();
        let b = generate_invite_token();
        assert_eq!(a.len(), 48);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn invite_email_links_to_the_frontend() {
        let email = invite_email("tech@example.com", "Blue Water", "https://app.dock-ops.com", "tok123");
        assert_eq!(email.to, "tech@example.com");
        assert_eq!(email.subject, "Invitation to join Blue Water on dock-ops");
        assert!(email.html.contains("https://app.dock-ops.com/invite/tok123"));
        assert!(email.html.contains("expire in 7 days"));
    }

    #[test]
    fn emails_compare_case_insensitively() {
        assert_eq!(normalize_email("  Ana@Example.COM "), normalize_email("ana@example.com"));
    }

    fn service(pool: &PgPool) -> OrgService {
        OrgService::new(
            pool.clone(),
            OrgRepository::new(pool.clone()),
            Arc::new(crate::integrations::mailer::LogMailer),
            "https://app.dock-ops.com".into(),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn expired_invite_is_rejected(pool: PgPool) {
        let (ctx, _) = seed_vessel(&pool).await;
        let guest = UserRepository::new(pool.clone())
            .upsert_from_identity("default", "user_deckhand", "deck@example.com", None)
            .await
            .expect("guest");

        OrgRepository::new(pool.clone())
            .create_invite(
                &pool,
                ctx.org_id,
                "deck@example.com",
                OrgRole::Tech,
                "expired-token",
                ctx.user.id,
                Utc::now() - Duration::days(1),
            )
            .await
            .expect("invite");

        let result = service(&pool).accept_invite(&guest, "expired-token").await;
        assert!(matches!(result, Err(AppError::InviteExpired)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn invite_for_another_email_is_rejected(pool: PgPool) {
        let (ctx, _) = seed_vessel(&pool).await;
        let stranger = UserRepository::new(pool.clone())
            .upsert_from_identity("default", "user_stranger", "someone@example.com", None)
            .await
            .expect("stranger");

        OrgRepository::new(pool.clone())
            .create_invite(
                &pool,
                ctx.org_id,
                "deck@example.com",
                OrgRole::Tech,
                "valid-token",
                ctx.user.id,
                Utc::now() + Duration::days(7),
            )
            .await
            .expect("invite");

        let result = service(&pool).accept_invite(&stranger, "valid-token").await;
        assert!(matches!(result, Err(AppError::InviteEmailMismatch)));
    }
}
