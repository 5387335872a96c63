// src/models/trips.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::inventory::InventoryAdjustment;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VesselTrip {
    pub id: Uuid,
    pub vessel_id: Uuid,
    pub logged_at: DateTime<Utc>,
    #[schema(example = "4.5")]
    pub hours: Decimal,
    #[schema(example = "Sunset cruise")]
    pub note: Option<String>,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Resposta do POST: a viagem e os ajustes que ela gerou
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripLogged {
    #[serde(flatten)]
    pub trip: VesselTrip,
    pub adjustments: Vec<InventoryAdjustment>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalHours {
    pub vessel_id: Uuid,
    #[schema(example = "132.25")]
    pub total_hours: Decimal,
}
