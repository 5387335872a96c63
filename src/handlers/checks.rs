// src/handlers/checks.rs
//
// Conferências de estoque: qualquer membro ativo pode abrir, preencher e enviar.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, Localize},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermParticipate, RequirePermission},
        tenancy::OrgContext,
    },
    models::inventory::{CheckLineCondition, InventoryCheck, InventoryCheckDetail, InventoryCheckLine},
    services::inventory_service::CheckLineInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckPayload {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckLinePayload {
    pub requirement_id: Uuid,

    #[validate(range(min = 0))]
    #[schema(example = 2)]
    pub actual_quantity: i32,

    #[schema(example = "OK")]
    pub condition: CheckLineCondition,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLinesPayload {
    #[validate(nested)]
    pub lines: Vec<CheckLinePayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinePayload {
    #[validate(range(min = 0))]
    pub actual_quantity: Option<i32>,
    pub condition: Option<CheckLineCondition>,
    pub notes: Option<String>,
}

// POST /api/vessels/{vessel_id}/inventory/checks
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/inventory/checks",
    tag = "Inventory checks",
    request_body = StartCheckPayload,
    responses(
        (status = 201, description = "Conferência aberta, uma linha por item", body = InventoryCheckDetail)
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_check(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<StartCheckPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let check = app_state
        .inventory_service
        .start_check(&ctx, vessel_id, payload.notes.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(check)))
}

// GET /api/vessels/{vessel_id}/inventory/checks
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/inventory/checks",
    tag = "Inventory checks",
    responses((status = 200, description = "Conferências, mais recentes primeiro", body = Vec<InventoryCheck>)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_checks(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let checks = app_state
        .inventory_service
        .list_checks(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(checks))
}

// GET /api/inventory/checks/{check_id}
#[utoipa::path(
    get,
    path = "/api/inventory/checks/{check_id}",
    tag = "Inventory checks",
    responses(
        (status = 200, description = "Conferência com as linhas", body = InventoryCheckDetail),
        (status = 404, description = "Conferência não encontrada")
    ),
    params(
        ("check_id" = Uuid, Path, description = "ID da conferência"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_check(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(check_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = app_state
        .inventory_service
        .get_check(&ctx, check_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(check))
}

// PUT /api/inventory/checks/{check_id}/lines
#[utoipa::path(
    put,
    path = "/api/inventory/checks/{check_id}/lines",
    tag = "Inventory checks",
    request_body = UpsertLinesPayload,
    responses(
        (status = 200, description = "Linhas gravadas", body = InventoryCheckDetail),
        (status = 400, description = "Conferência já enviada ou item de outra embarcação")
    ),
    params(
        ("check_id" = Uuid, Path, description = "ID da conferência"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_lines(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path(check_id): Path<Uuid>,
    Json(payload): Json<UpsertLinesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lines: Vec<CheckLineInput> = payload
        .lines
        .into_iter()
        .map(|line| CheckLineInput {
            requirement_id: line.requirement_id,
            actual_quantity: line.actual_quantity,
            condition: line.condition,
            notes: line.notes,
        })
        .collect();

    let check = app_state
        .inventory_service
        .upsert_lines(&ctx, check_id, &lines)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(check))
}

// PATCH /api/inventory/checks/{check_id}/lines/{line_id}
#[utoipa::path(
    patch,
    path = "/api/inventory/checks/{check_id}/lines/{line_id}",
    tag = "Inventory checks",
    request_body = UpdateLinePayload,
    responses(
        (status = 200, description = "Linha atualizada", body = InventoryCheckLine),
        (status = 400, description = "Conferência já enviada"),
        (status = 404, description = "Linha não encontrada")
    ),
    params(
        ("check_id" = Uuid, Path, description = "ID da conferência"),
        ("line_id" = Uuid, Path, description = "ID da linha"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_line(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path((check_id, line_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let line = app_state
        .inventory_service
        .update_line(
            &ctx,
            check_id,
            line_id,
            payload.actual_quantity,
            payload.condition,
            payload.notes.as_deref(),
        )
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(line))
}

// POST /api/inventory/checks/{check_id}/submit
#[utoipa::path(
    post,
    path = "/api/inventory/checks/{check_id}/submit",
    tag = "Inventory checks",
    responses(
        (status = 200, description = "Conferência enviada e estoque reconciliado", body = InventoryCheckDetail),
        (status = 400, description = "Conferência já enviada")
    ),
    params(
        ("check_id" = Uuid, Path, description = "ID da conferência"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_check(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path(check_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = app_state
        .inventory_service
        .submit_check(&ctx, check_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(check))
}
