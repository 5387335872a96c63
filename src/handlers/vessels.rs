// src/handlers/vessels.rs

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
    common::{
        error::{ApiError, AppError, Localize},
        patch::double_option,
    },
    config::AppState,
    db::vessel_repo::{VesselFields, VesselPatch},
    middleware::{
        i18n::Locale,
        rbac::{PermManageVessels, PermParticipate, RequirePermission},
        tenancy::OrgContext,
    },
    models::vessel::{CommentView, Vessel},
};

// =============================================================================
//  EMBARCAÇÕES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVesselPayload {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Sea Breeze")]
    pub name: String,

    #[validate(length(max = 255))]
    #[schema(example = "Beneteau")]
    pub make: Option<String>,

    #[validate(length(max = 255))]
    #[schema(example = "Oceanis 46.1")]
    pub model: Option<String>,

    #[validate(range(min = 1900, max = 2100))]
    #[schema(example = 2019)]
    pub year: Option<i32>,

    pub description: Option<String>,

    #[validate(length(max = 255))]
    #[schema(example = "Marina da Glória")]
    pub location: Option<String>,
}

// PATCH: campos ausentes não mudam; `null` limpa os opcionais
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVesselPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255))]
    #[schema(value_type = Option<String>)]
    pub make: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255))]
    #[schema(value_type = Option<String>)]
    pub model: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1900, max = 2100))]
    #[schema(value_type = Option<i32>)]
    pub year: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255))]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
}

impl UpdateVesselPayload {
    fn as_patch(&self) -> VesselPatch<'_> {
        VesselPatch {
            name: self.name.as_deref().map(str::trim),
            make: self.make.as_ref().map(Option::as_deref),
            model: self.model.as_ref().map(Option::as_deref),
            year: self.year,
            description: self.description.as_ref().map(Option::as_deref),
            location: self.location.as_ref().map(Option::as_deref),
        }
    }
}

// GET /api/vessels
#[utoipa::path(
    get,
    path = "/api/vessels",
    tag = "Vessels",
    responses(
        (status = 200, description = "Embarcações da organização", body = Vec<Vessel>)
    ),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_vessels(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let vessels = app_state
        .vessel_service
        .list(&ctx)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(vessels))
}

// POST /api/vessels
#[utoipa::path(
    post,
    path = "/api/vessels",
    tag = "Vessels",
    request_body = CreateVesselPayload,
    responses(
        (status = 201, description = "Embarcação criada", body = Vessel),
        (status = 409, description = "Limite de embarcações atingido (política reject)")
    ),
    params(("x-org-id" = Uuid, Header, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_vessel(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermManageVessels>,
    Json(payload): Json<CreateVesselPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let fields = VesselFields {
        make: payload.make.as_deref(),
        model: payload.model.as_deref(),
        year: payload.year,
        description: payload.description.as_deref(),
        location: payload.location.as_deref(),
    };

    let vessel = app_state
        .vessel_service
        .create(&ctx, payload.name.trim(), &fields)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(vessel)))
}

// GET /api/vessels/{vessel_id}
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}",
    tag = "Vessels",
    responses(
        (status = 200, description = "Embarcação", body = Vessel),
        (status = 404, description = "Embarcação não encontrada")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_vessel(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let vessel = app_state
        .vessel_service
        .get(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(vessel))
}

// PATCH /api/vessels/{vessel_id}
#[utoipa::path(
    patch,
    path = "/api/vessels/{vessel_id}",
    tag = "Vessels",
    request_body = UpdateVesselPayload,
    responses(
        (status = 200, description = "Embarcação atualizada", body = Vessel),
        (status = 404, description = "Embarcação não encontrada")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_vessel(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermManageVessels>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<UpdateVesselPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let vessel = app_state
        .vessel_service
        .update(&ctx, vessel_id, &payload.as_patch())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(vessel))
}

// DELETE /api/vessels/{vessel_id}
#[utoipa::path(
    delete,
    path = "/api/vessels/{vessel_id}",
    tag = "Vessels",
    responses(
        (status = 204, description = "Embarcação removida (com tudo que pertence a ela)"),
        (status = 404, description = "Embarcação não encontrada")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_vessel(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermManageVessels>,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .vessel_service
        .delete(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  COMENTÁRIOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentPayload {
    #[validate(length(min = 1, code = "required"))]
    #[schema(example = "Bilge pump sounds rough, check next trip.")]
    pub body: String,
}

// GET /api/vessels/{vessel_id}/comments
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/comments",
    tag = "Vessels",
    responses(
        (status = 200, description = "Comentários, mais recentes primeiro", body = Vec<CommentView>)
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = app_state
        .vessel_service
        .list_comments(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(comments))
}

// POST /api/vessels/{vessel_id}/comments
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/comments",
    tag = "Vessels",
    request_body = CreateCommentPayload,
    responses(
        (status = 201, description = "Comentário criado", body = CommentView)
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermParticipate>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .vessel_service
        .add_comment(&ctx, vessel_id, payload.body.trim())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vessel_patch_clears_only_explicit_nulls() {
        let payload: UpdateVesselPayload =
            serde_json::from_str(r#"{"make": null, "year": 1998, "name": " Sea Breeze "}"#).unwrap();
        let patch = payload.as_patch();
        assert_eq!(patch.name, Some("Sea Breeze"));
        assert_eq!(patch.make, Some(None));
        assert_eq!(patch.model, None);
        assert_eq!(patch.year, Some(Some(1998)));
        assert_eq!(patch.location, None);
    }

    #[test]
    fn vessel_patch_still_validates_present_values() {
        let payload: UpdateVesselPayload = serde_json::from_str(r#"{"year": 1800}"#).unwrap();
        assert!(payload.validate().is_err());

        let cleared: UpdateVesselPayload = serde_json::from_str(r#"{"year": null}"#).unwrap();
        assert!(cleared.validate().is_ok());
    }
}
