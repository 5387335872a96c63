// src/handlers/admin.rs
//
// Rotas de plataforma: exigem apenas a flag de super admin, sem x-org-id.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, Localize},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, rbac::RequireSuperAdmin},
    models::{
        auth::User,
        organization::{AdminOrgSummary, OrgRequestStatus, Organization, OrganizationRequestView},
    },
};

// GET /api/admin/orgs
#[utoipa::path(
    get,
    path = "/api/admin/orgs",
    tag = "Admin",
    responses(
        (status = 200, description = "Todas as organizações", body = Vec<AdminOrgSummary>),
        (status = 403, description = "Somente super admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orgs(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let orgs = app_state
        .admin_service
        .list_orgs()
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(orgs))
}

// POST /api/admin/orgs/{org_id}/toggle-status
#[utoipa::path(
    post,
    path = "/api/admin/orgs/{org_id}/toggle-status",
    tag = "Admin",
    responses(
        (status = 200, description = "Organização ativada/desativada", body = Organization),
        (status = 404, description = "Organização não encontrada")
    ),
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn toggle_org_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let org = app_state
        .admin_service
        .toggle_org_status(org_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(org))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingOverridePayload {
    pub enabled: bool,

    #[validate(range(min = 0))]
    #[schema(example = 10)]
    pub vessel_limit: Option<i32>,

    pub expires_at: Option<DateTime<Utc>>,

    #[validate(length(max = 500))]
    #[schema(example = "Parceria de lançamento")]
    pub reason: Option<String>,
}

// PUT /api/admin/orgs/{org_id}/billing-override
#[utoipa::path(
    put,
    path = "/api/admin/orgs/{org_id}/billing-override",
    tag = "Admin",
    request_body = BillingOverridePayload,
    responses(
        (status = 200, description = "Override de cobrança gravado", body = Organization),
        (status = 404, description = "Organização não encontrada")
    ),
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn set_billing_override(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<BillingOverridePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let org = app_state
        .admin_service
        .set_billing_override(
            org_id,
            payload.enabled,
            payload.vessel_limit,
            payload.expires_at,
            payload.reason.as_deref(),
        )
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(org))
}

// GET /api/admin/users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "Todos os usuários", body = Vec<User>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let users = app_state
        .admin_service
        .list_users()
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(users))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    /// PENDING, APPROVED ou REJECTED
    pub status: Option<OrgRequestStatus>,
}

// GET /api/admin/orgs/requests
#[utoipa::path(
    get,
    path = "/api/admin/orgs/requests",
    tag = "Admin",
    params(RequestFilter),
    responses(
        (status = 200, description = "Pedidos de organização", body = Vec<OrganizationRequestView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
    Query(filter): Query<RequestFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = app_state
        .admin_service
        .list_requests(filter.status)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(requests))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestPayload {
    #[schema(example = "APPROVED")]
    pub status: OrgRequestStatus,

    #[validate(length(max = 1000))]
    pub review_notes: Option<String>,
}

// POST /api/admin/orgs/requests/{request_id}/review
#[utoipa::path(
    post,
    path = "/api/admin/orgs/requests/{request_id}/review",
    tag = "Admin",
    request_body = ReviewRequestPayload,
    responses(
        (status = 200, description = "Pedido analisado", body = OrganizationRequestView),
        (status = 400, description = "Pedido já analisado ou status inválido"),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("request_id" = Uuid, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn review_request(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireSuperAdmin,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ReviewRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .admin_service
        .review_request(&reviewer, request_id, payload.status, payload.review_notes.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(request))
}
