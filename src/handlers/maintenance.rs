// src/handlers/maintenance.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError, Localize},
        patch::double_option,
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermEditMaintenance, PermParticipate, RequirePermission},
        tenancy::OrgContext,
    },
    models::maintenance::{CadenceType, MaintenanceLogView, MaintenanceTaskDetail, MaintenanceTaskView},
    services::maintenance_service::{TaskDraft, TaskUpdate},
};

// =============================================================================
//  TAREFAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Change engine oil")]
    pub name: String,

    pub description: Option<String>,

    #[schema(example = "INTERVAL")]
    pub cadence_type: CadenceType,

    #[validate(range(min = 1))]
    #[schema(example = 90)]
    pub interval_days: Option<i32>,

    #[schema(value_type = Option<f64>, example = 100)]
    pub interval_hours: Option<Decimal>,

    pub due_date: Option<DateTime<Utc>>,

    // Primeiro vencimento explícito (opcional)
    pub next_due_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub critical: bool,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    pub cadence_type: Option<CadenceType>,

    // `null` limpa o intervalo; a combinação final ainda precisa ser válida
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1))]
    #[schema(value_type = Option<i32>)]
    pub interval_days: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub interval_hours: Option<Option<Decimal>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub next_due_at: Option<DateTime<Utc>>,
    pub critical: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTasksPayload {
    pub task_ids: Vec<Uuid>,
}

// GET /api/vessels/{vessel_id}/maintenance/tasks
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/maintenance/tasks",
    tag = "Maintenance",
    responses((status = 200, description = "Tarefas com projeção por horas", body = Vec<MaintenanceTaskView>)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = app_state
        .maintenance_service
        .list_tasks(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(tasks))
}

// POST /api/vessels/{vessel_id}/maintenance/tasks
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/maintenance/tasks",
    tag = "Maintenance",
    request_body = CreateTaskPayload,
    responses(
        (status = 201, description = "Tarefa criada", body = MaintenanceTaskView),
        (status = 400, description = "Cadência incompleta")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditMaintenance>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let draft = TaskDraft {
        name: payload.name.trim(),
        description: payload.description.as_deref(),
        cadence_type: payload.cadence_type,
        interval_days: payload.interval_days,
        interval_hours: payload.interval_hours,
        due_date: payload.due_date,
        next_due_at: payload.next_due_at,
        critical: payload.critical,
        is_active: payload.is_active,
    };

    let task = app_state
        .maintenance_service
        .create_task(&ctx, vessel_id, &draft)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(task)))
}

// PUT /api/vessels/{vessel_id}/maintenance/tasks/reorder
#[utoipa::path(
    put,
    path = "/api/vessels/{vessel_id}/maintenance/tasks/reorder",
    tag = "Maintenance",
    request_body = ReorderTasksPayload,
    responses(
        (status = 200, description = "Tarefas reordenadas", body = Vec<MaintenanceTaskView>),
        (status = 400, description = "A lista não corresponde exatamente às tarefas atuais")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_tasks(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditMaintenance>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<ReorderTasksPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = app_state
        .maintenance_service
        .reorder_tasks(&ctx, vessel_id, &payload.task_ids)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(tasks))
}

// GET /api/maintenance/tasks/{task_id}
#[utoipa::path(
    get,
    path = "/api/maintenance/tasks/{task_id}",
    tag = "Maintenance",
    responses(
        (status = 200, description = "Tarefa com os registros de execução", body = MaintenanceTaskDetail),
        (status = 404, description = "Tarefa não encontrada")
    ),
    params(
        ("task_id" = Uuid, Path, description = "ID da tarefa"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .maintenance_service
        .get_task(&ctx, task_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(task))
}

// PATCH /api/maintenance/tasks/{task_id}
#[utoipa::path(
    patch,
    path = "/api/maintenance/tasks/{task_id}",
    tag = "Maintenance",
    request_body = UpdateTaskPayload,
    responses(
        (status = 200, description = "Tarefa atualizada (vencimento recalculado)", body = MaintenanceTaskView),
        (status = 404, description = "Tarefa não encontrada")
    ),
    params(
        ("task_id" = Uuid, Path, description = "ID da tarefa"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditMaintenance>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let update = TaskUpdate {
        name: payload.name.as_deref().map(str::trim),
        description: payload.description.as_ref().map(Option::as_deref),
        cadence_type: payload.cadence_type,
        interval_days: payload.interval_days,
        interval_hours: payload.interval_hours,
        due_date: payload.due_date,
        next_due_at: payload.next_due_at,
        critical: payload.critical,
        is_active: payload.is_active,
    };

    let task = app_state
        .maintenance_service
        .update_task(&ctx, task_id, &update)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(task))
}

// DELETE /api/maintenance/tasks/{task_id}
#[utoipa::path(
    delete,
    path = "/api/maintenance/tasks/{task_id}",
    tag = "Maintenance",
    responses(
        (status = 204, description = "Tarefa removida"),
        (status = 404, description = "Tarefa não encontrada")
    ),
    params(
        ("task_id" = Uuid, Path, description = "ID da tarefa"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditMaintenance>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .maintenance_service
        .delete_task(&ctx, task_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  REGISTROS DE EXECUÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogPayload {
    // Padrão: agora
    pub performed_at: Option<DateTime<Utc>>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

// POST /api/maintenance/tasks/{task_id}/logs
#[utoipa::path(
    post,
    path = "/api/maintenance/tasks/{task_id}/logs",
    tag = "Maintenance",
    request_body = CreateLogPayload,
    responses(
        (status = 201, description = "Execução registrada; próximo vencimento avançado", body = MaintenanceLogView),
        (status = 404, description = "Tarefa não encontrada")
    ),
    params(
        ("task_id" = Uuid, Path, description = "ID da tarefa"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_log(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateLogPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let log = app_state
        .maintenance_service
        .create_log(&ctx, task_id, payload.performed_at, payload.notes.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(log)))
}

// GET /api/maintenance/tasks/{task_id}/logs
#[utoipa::path(
    get,
    path = "/api/maintenance/tasks/{task_id}/logs",
    tag = "Maintenance",
    responses((status = 200, description = "Execuções, mais recentes primeiro", body = Vec<MaintenanceLogView>)),
    params(
        ("task_id" = Uuid, Path, description = "ID da tarefa"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = app_state
        .maintenance_service
        .list_logs(&ctx, task_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(logs))
}
