// src/models/organization.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (tipos do Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "org_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRole {
    Admin,
    Manager,
    Tech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "membership_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Invited,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "org_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRequestStatus {
    Pending,
    Approved,
    Rejected,
}

// --- Organização (tenant) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Blue Water Charters")]
    pub name: String,
    pub is_active: bool,

    // Override manual de cobrança (super admin)
    pub billing_override_enabled: bool,
    pub billing_override_vessel_limit: Option<i32>,
    pub billing_override_expires_at: Option<DateTime<Utc>>,
    pub billing_override_reason: Option<String>,

    // Dados da assinatura (sincronizados pelo webhook)
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,
    #[schema(example = "active")]
    pub subscription_status: Option<String>,
    #[schema(example = "base")]
    pub subscription_plan: Option<String>,
    pub addon_pack_quantity: i32,
    pub vessel_limit: Option<i32>,
    pub current_period_end: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgMembership {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Membro + dados do usuário (join), montado na consulta
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
    pub status: MembershipStatus,
    #[schema(example = "tech@example.com")]
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgInvite {
    pub id: Uuid,
    pub org_id: Uuid,
    #[schema(example = "new.tech@example.com")]
    pub email: String,
    pub role: OrgRole,
    // O token é a credencial do convite: nunca sai nas listagens.
    #[serde(skip_serializing)]
    pub token: String,
    pub invited_by_user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRequest {
    pub id: Uuid,
    pub requested_by_user_id: Uuid,
    #[schema(example = "Harbor Patrol Co.")]
    pub org_name: String,
    pub status: OrgRequestStatus,
    pub reviewed_by_user_id: Option<Uuid>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_org_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Solicitação + quem pediu (tela do super admin)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRequestView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: OrganizationRequest,
    pub requester_email: String,
    pub requester_name: Option<String>,
}

// Resumo de organização para o painel do super admin
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrgSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub organization: Organization,
    pub member_count: i64,
    pub vessel_count: i64,
}
