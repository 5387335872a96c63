// src/handlers/billing.rs

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, Localize},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermAdministerOrg, RequirePermission},
        tenancy::OrgContext,
    },
    models::billing::{BillingStatus, PackUpdateResult, RedirectUrl, WebhookAck},
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackQuantityPayload {
    // Valores negativos viram 0
    #[serde(default)]
    #[schema(example = 1)]
    pub pack_quantity: i32,
}

// POST /api/billing/checkout-session
#[utoipa::path(
    post,
    path = "/api/billing/checkout-session",
    tag = "Billing",
    request_body = PackQuantityPayload,
    responses(
        (status = 200, description = "URL do checkout hospedado", body = RedirectUrl),
        (status = 500, description = "Cobrança não configurada")
    ),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_checkout_session(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Json(payload): Json<PackQuantityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let redirect = app_state
        .billing_service
        .checkout(&ctx, payload.pack_quantity)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(redirect))
}

// POST /api/billing/update-vessel-packs
#[utoipa::path(
    post,
    path = "/api/billing/update-vessel-packs",
    tag = "Billing",
    request_body = PackQuantityPayload,
    responses(
        (status = 200, description = "Quantidade de pacotes alterada no provedor", body = PackUpdateResult),
        (status = 400, description = "Sem assinatura ativa")
    ),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn update_vessel_packs(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Json(payload): Json<PackQuantityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .billing_service
        .update_vessel_packs(&ctx, payload.pack_quantity)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(result))
}

// POST /api/billing/portal
#[utoipa::path(
    post,
    path = "/api/billing/portal",
    tag = "Billing",
    responses(
        (status = 200, description = "URL do portal do cliente", body = RedirectUrl),
        (status = 400, description = "Organização sem conta de cobrança")
    ),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_portal_session(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
) -> Result<impl IntoResponse, ApiError> {
    let redirect = app_state
        .billing_service
        .portal(&ctx)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(redirect))
}

// GET /api/billing/status
#[utoipa::path(
    get,
    path = "/api/billing/status",
    tag = "Billing",
    responses((status = 200, description = "Plano, uso e limite efetivo", body = BillingStatus)),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn billing_status(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
) -> Result<impl IntoResponse, ApiError> {
    let status = app_state
        .billing_service
        .status(&ctx)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(status))
}

// POST /api/webhooks/stripe
// Sem JWT: a autenticação é a assinatura do corpo cru.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Billing",
    request_body(content = String, description = "Evento do provedor (JSON cru)", content_type = "application/json"),
    responses(
        (status = 200, description = "Evento recebido", body = WebhookAck),
        (status = 400, description = "Assinatura ou conteúdo inválido"),
        (status = 500, description = "Segredo do webhook não configurado")
    ),
    params(("stripe-signature" = String, Header, description = "t=<timestamp>,v1=<hmac>"))
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ack = app_state
        .billing_service
        .handle_webhook(&body, signature)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(ack))
}
