// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Motivos gravados em inventory_adjustments.reason
pub const REASON_TRIP: &str = "trip";
pub const REASON_MANUAL: &str = "manual";
pub const REASON_CHECK: &str = "check";

// --- 1. Grupos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryGroup {
    pub id: Uuid,
    pub vessel_id: Uuid,
    #[schema(example = "Safety gear")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 0)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Itens exigidos na embarcação ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRequirement {
    pub id: Uuid,
    pub vessel_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    #[schema(example = "Engine oil filter")]
    pub item_name: String,
    #[schema(example = 2)]
    pub required_quantity: i32,
    #[schema(example = "Engine")]
    pub category: Option<String>,
    pub critical: bool,
    pub notes: Option<String>,
    pub sort_order: i32,
    #[schema(example = 10)]
    pub current_quantity: i32,

    // Consumo automático por hora de uso (só vale com auto_consume_enabled)
    pub auto_consume_enabled: bool,
    #[schema(example = "1.5")]
    pub consume_per_hour: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 3. Conferências (stocktake) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "inventory_check_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryCheckStatus {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "check_line_condition", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckLineCondition {
    Ok,
    NeedsReplacement,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheck {
    pub id: Uuid,
    pub vessel_id: Uuid,
    pub performed_by_user_id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub status: InventoryCheckStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckLine {
    pub id: Uuid,
    pub inventory_check_id: Uuid,
    pub requirement_id: Uuid,
    #[schema(example = 2)]
    pub actual_quantity: i32,
    pub condition: CheckLineCondition,
    pub notes: Option<String>,
    /// Nulo enquanto a linha guarda só a quantidade pré-carregada.
    pub counted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckDetail {
    #[serde(flatten)]
    pub check: InventoryCheck,
    pub lines: Vec<InventoryCheckLine>,
}

// Histórico de um item: linhas de conferência + data da conferência
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequirementHistoryEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub line: InventoryCheckLine,
    pub check_status: InventoryCheckStatus,
    pub performed_at: DateTime<Utc>,
}

// --- 4. Ajustes (auditoria, nunca alterados) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub requirement_id: Uuid,
    #[schema(example = "trip")]
    pub reason: String,
    pub reference_trip_id: Option<Uuid>,
    #[schema(example = -6)]
    pub delta: i32,
    #[schema(example = 10)]
    pub before_qty: i32,
    #[schema(example = 4)]
    pub after_qty: i32,
    pub note: Option<String>,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
