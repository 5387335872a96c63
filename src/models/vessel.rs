// src/models/vessel.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    pub id: Uuid,
    pub org_id: Uuid,
    #[schema(example = "Sea Breeze")]
    pub name: String,
    #[schema(example = "Beneteau")]
    pub make: Option<String>,
    #[schema(example = "Oceanis 46.1")]
    pub model: Option<String>,
    #[schema(example = 2019)]
    pub year: Option<i32>,
    pub description: Option<String>,
    #[schema(example = "Marina da Glória")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VesselComment {
    pub id: Uuid,
    pub vessel_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Bilge pump sounds rough, check next trip.")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// Comentário já com o autor (nada é "injetado" depois)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: VesselComment,
    pub author_name: Option<String>,
    pub author_email: String,
}
