// src/models/maintenance.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "maintenance_cadence_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CadenceType {
    Interval,
    SpecificDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTask {
    pub id: Uuid,
    pub vessel_id: Uuid,
    #[schema(example = "Change engine oil")]
    pub name: String,
    pub description: Option<String>,
    pub cadence_type: CadenceType,
    #[schema(example = 90)]
    pub interval_days: Option<i32>,
    #[schema(example = "100")]
    pub interval_hours: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub last_completed_total_hours: Option<Decimal>,
    pub critical: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Tarefa + projeção por horas de uso (calculada, não persistida)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTaskView {
    #[serde(flatten)]
    pub task: MaintenanceTask,
    pub due_at_hours: Option<Decimal>,
    pub hours_remaining: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceLog {
    pub id: Uuid,
    pub maintenance_task_id: Uuid,
    pub performed_by_user_id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Log + quem executou (join no SELECT)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceLogView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: MaintenanceLog,
    pub performed_by_name: Option<String>,
    pub performed_by_email: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTaskDetail {
    #[serde(flatten)]
    pub task: MaintenanceTaskView,
    pub logs: Vec<MaintenanceLogView>,
}
