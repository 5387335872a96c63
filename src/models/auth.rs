// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::organization::{MembershipStatus, OrgRole};

// Usuário global. O provedor de identidade é externo; aqui só guardamos o vínculo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "default")]
    pub auth_provider: String,
    #[schema(example = "user_2abc")]
    pub auth_subject: String,
    #[schema(example = "captain@example.com")]
    pub email: String,
    #[schema(example = "Ana Souza")]
    pub name: Option<String>,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Claims do JWT emitido pelo provedor de identidade (HS256)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (id do usuário no provedor)
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

// Uma linha de "minhas organizações"
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyMembership {
    pub org_id: Uuid,
    #[schema(example = "Blue Water Charters")]
    pub org_name: String,
    pub org_is_active: bool,
    pub role: OrgRole,
    pub status: MembershipStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: User,
    pub memberships: Vec<MyMembership>,
}
