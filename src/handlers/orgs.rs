// src/handlers/orgs.rs

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
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermAdministerOrg, RequirePermission},
        tenancy::OrgContext,
    },
    models::organization::{MemberView, OrgInvite, OrgMembership, OrgRole, Organization, OrganizationRequest},
};

// =============================================================================
//  ORGANIZAÇÕES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrgPayload {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Blue Water Charters")]
    pub name: String,

    // Ignora o aviso de nome duplicado
    #[serde(default)]
    pub force: bool,
}

// POST /api/orgs
#[utoipa::path(
    post,
    path = "/api/orgs",
    tag = "Organizations",
    request_body = CreateOrgPayload,
    responses(
        (status = 201, description = "Organização criada (chamador vira ADMIN)", body = Organization),
        (status = 409, description = "Já existe uma organização com esse nome")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_org(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrgPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let org = app_state
        .org_service
        .create_org(&user, payload.name.trim(), payload.force)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(org)))
}

// GET /api/orgs
#[utoipa::path(
    get,
    path = "/api/orgs",
    tag = "Organizations",
    responses(
        (status = 200, description = "Organizações onde o usuário é membro ativo", body = Vec<Organization>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_orgs(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let orgs = app_state
        .org_service
        .list_my_orgs(&user)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(orgs))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgRequestPayload {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Harbor Yachts")]
    pub org_name: String,
}

// POST /api/orgs/requests
#[utoipa::path(
    post,
    path = "/api/orgs/requests",
    tag = "Organizations",
    request_body = OrgRequestPayload,
    responses(
        (status = 201, description = "Pedido registrado", body = OrganizationRequest),
        (status = 409, description = "Pedido pendente ou já é membro de uma organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_org(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<OrgRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .org_service
        .request_org(&user, payload.org_name.trim())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(request)))
}

// =============================================================================
//  MEMBROS (ADMIN)
// =============================================================================

// GET /api/orgs/{org_id}/members
#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/members",
    tag = "Organizations",
    responses(
        (status = 200, description = "Membros com nome e email", body = Vec<MemberView>),
        (status = 403, description = "Somente ADMIN")
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .org_service
        .list_members(&ctx, org_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(members))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRolePayload {
    #[schema(example = "MANAGER")]
    pub role: OrgRole,
}

// POST /api/orgs/{org_id}/members/{user_id}/role
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/members/{user_id}/role",
    tag = "Organizations",
    request_body = ChangeRolePayload,
    responses(
        (status = 200, description = "Cargo alterado", body = OrgMembership),
        (status = 400, description = "Não é possível alterar o próprio cargo"),
        (status = 404, description = "Membro não encontrado")
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("user_id" = Uuid, Path, description = "ID do usuário"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_role(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ChangeRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = app_state
        .org_service
        .change_role(&ctx, org_id, user_id, payload.role)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(membership))
}

// POST /api/orgs/{org_id}/members/{user_id}/disable
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/members/{user_id}/disable",
    tag = "Organizations",
    responses(
        (status = 200, description = "Membro desativado", body = OrgMembership),
        (status = 400, description = "Não é possível desativar a si mesmo"),
        (status = 404, description = "Membro não encontrado")
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("user_id" = Uuid, Path, description = "ID do usuário"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn disable_member(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = app_state
        .org_service
        .disable_member(&ctx, org_id, user_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(membership))
}

// =============================================================================
//  CONVITES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitePayload {
    #[validate(email)]
    #[schema(example = "deckhand@example.com")]
    pub email: String,

    #[schema(example = "TECH")]
    pub role: OrgRole,
}

// POST /api/orgs/{org_id}/invites
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/invites",
    tag = "Organizations",
    request_body = CreateInvitePayload,
    responses(
        (status = 201, description = "Convite criado e email enviado", body = OrgInvite),
        (status = 409, description = "Já é membro ou já existe convite pendente")
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateInvitePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let invite = app_state
        .org_service
        .create_invite(&ctx, org_id, &payload.email, payload.role)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(invite)))
}

// GET /api/orgs/{org_id}/invites
#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/invites",
    tag = "Organizations",
    responses(
        (status = 200, description = "Convites pendentes", body = Vec<OrgInvite>)
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invites(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let invites = app_state
        .org_service
        .list_invites(&ctx, org_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(invites))
}

// POST /api/orgs/{org_id}/invites/{invite_id}/revoke
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/invites/{invite_id}/revoke",
    tag = "Organizations",
    responses(
        (status = 200, description = "Convite revogado", body = OrgInvite),
        (status = 404, description = "Convite não encontrado")
    ),
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("invite_id" = Uuid, Path, description = "ID do convite"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermAdministerOrg>,
    Path((org_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let invite = app_state
        .org_service
        .revoke_invite(&ctx, org_id, invite_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(invite))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitePayload {
    #[validate(length(min = 1, code = "required"))]
    pub token: String,
}

// POST /api/orgs/invites/accept
#[utoipa::path(
    post,
    path = "/api/orgs/invites/accept",
    tag = "Organizations",
    request_body = AcceptInvitePayload,
    responses(
        (status = 200, description = "Convite aceito", body = OrgMembership),
        (status = 400, description = "Convite aceito, revogado ou expirado"),
        (status = 403, description = "Email do convite não confere"),
        (status = 404, description = "Token desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<AcceptInvitePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let membership = app_state
        .org_service
        .accept_invite(&user, &payload.token)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(membership))
}
