// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
    db::inventory_repo::RequirementPatch,
    middleware::{
        i18n::Locale,
        rbac::{PermEditInventory, RequirePermission},
        tenancy::OrgContext,
    },
    models::inventory::{InventoryAdjustment, InventoryGroup, InventoryRequirement, RequirementHistoryEntry},
    rules::RuleError,
    services::inventory_service::RequirementDraft,
};

fn ensure_rate_not_negative(rate: Option<Decimal>) -> Result<(), AppError> {
    match rate {
        Some(rate) if rate < Decimal::ZERO => {
            Err(RuleError::new("consume_per_hour", "must_not_be_negative").into())
        }
        _ => Ok(()),
    }
}

// =============================================================================
//  ÁREA 1: GRUPOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupPayload {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Safety gear")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderGroupsPayload {
    pub group_ids: Vec<Uuid>,
}

// GET /api/vessels/{vessel_id}/inventory/groups
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/inventory/groups",
    tag = "Inventory",
    responses((status = 200, description = "Grupos na ordem de exibição", body = Vec<InventoryGroup>)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = app_state
        .inventory_service
        .list_groups(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(groups))
}

// POST /api/vessels/{vessel_id}/inventory/groups
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/inventory/groups",
    tag = "Inventory",
    request_body = CreateGroupPayload,
    responses((status = 201, description = "Grupo criado no fim da lista", body = InventoryGroup)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_group(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .inventory_service
        .create_group(&ctx, vessel_id, payload.name.trim(), payload.description.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(group)))
}

// PUT /api/vessels/{vessel_id}/inventory/groups/reorder
#[utoipa::path(
    put,
    path = "/api/vessels/{vessel_id}/inventory/groups/reorder",
    tag = "Inventory",
    request_body = ReorderGroupsPayload,
    responses(
        (status = 200, description = "Grupos reordenados", body = Vec<InventoryGroup>),
        (status = 400, description = "A lista não corresponde exatamente aos grupos atuais")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<ReorderGroupsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = app_state
        .inventory_service
        .reorder_groups(&ctx, vessel_id, &payload.group_ids)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(groups))
}

// PATCH /api/inventory/groups/{group_id}
#[utoipa::path(
    patch,
    path = "/api/inventory/groups/{group_id}",
    tag = "Inventory",
    request_body = UpdateGroupPayload,
    responses(
        (status = 200, description = "Grupo atualizado", body = InventoryGroup),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("group_id" = Uuid, Path, description = "ID do grupo"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_group(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .inventory_service
        .update_group(
            &ctx,
            group_id,
            payload.name.as_deref().map(str::trim),
            payload.description.as_deref(),
        )
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(group))
}

// DELETE /api/inventory/groups/{group_id}
#[utoipa::path(
    delete,
    path = "/api/inventory/groups/{group_id}",
    tag = "Inventory",
    responses(
        (status = 204, description = "Grupo removido; os itens ficam sem grupo"),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("group_id" = Uuid, Path, description = "ID do grupo"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_group(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .inventory_service
        .delete_group(&ctx, group_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: ITENS EXIGIDOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequirementPayload {
    pub parent_group_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Engine oil filter")]
    pub item_name: String,

    #[validate(range(min = 0))]
    #[schema(example = 2)]
    pub required_quantity: i32,

    #[validate(length(max = 100))]
    #[schema(example = "Engine")]
    pub category: Option<String>,

    #[serde(default)]
    pub critical: bool,

    pub notes: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    #[schema(example = 10)]
    pub current_quantity: i32,

    #[serde(default)]
    pub auto_consume_enabled: bool,

    #[schema(value_type = Option<f64>, example = 1.5)]
    pub consume_per_hour: Option<Decimal>,
}

// PATCH: os campos opcionais aceitam null para limpar
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequirementPayload {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_group_id: Option<Option<Uuid>>,

    #[validate(length(min = 1, max = 255))]
    pub item_name: Option<String>,

    #[validate(range(min = 0))]
    pub required_quantity: Option<i32>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,

    pub critical: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,

    pub auto_consume_enabled: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub consume_per_hour: Option<Option<Decimal>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequirementsPayload {
    // null = itens sem grupo
    pub group_id: Option<Uuid>,
    pub item_ids: Vec<Uuid>,
}

// GET /api/vessels/{vessel_id}/inventory/requirements
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/inventory/requirements",
    tag = "Inventory",
    responses((status = 200, description = "Itens ordenados por grupo e posição", body = Vec<InventoryRequirement>)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_requirements(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let requirements = app_state
        .inventory_service
        .list_requirements(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(requirements))
}

// POST /api/vessels/{vessel_id}/inventory/requirements
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/inventory/requirements",
    tag = "Inventory",
    request_body = CreateRequirementPayload,
    responses(
        (status = 201, description = "Item criado no fim do seu grupo", body = InventoryRequirement),
        (status = 404, description = "Embarcação ou grupo não encontrado")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_requirement(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<CreateRequirementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    ensure_rate_not_negative(payload.consume_per_hour).localized(&locale, &app_state.i18n_store)?;

    let draft = RequirementDraft {
        parent_group_id: payload.parent_group_id,
        item_name: &payload.item_name,
        required_quantity: payload.required_quantity,
        category: payload.category.as_deref(),
        critical: payload.critical,
        notes: payload.notes.as_deref(),
        current_quantity: payload.current_quantity,
        auto_consume_enabled: payload.auto_consume_enabled,
        consume_per_hour: payload.consume_per_hour,
    };

    let requirement = app_state
        .inventory_service
        .create_requirement(&ctx, vessel_id, &draft)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(requirement)))
}

// PUT /api/vessels/{vessel_id}/inventory/items/reorder
#[utoipa::path(
    put,
    path = "/api/vessels/{vessel_id}/inventory/items/reorder",
    tag = "Inventory",
    request_body = ReorderRequirementsPayload,
    responses(
        (status = 200, description = "Itens do grupo reordenados", body = Vec<InventoryRequirement>),
        (status = 400, description = "A lista não corresponde exatamente aos itens do grupo")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_requirements(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<ReorderRequirementsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let requirements = app_state
        .inventory_service
        .reorder_requirements(&ctx, vessel_id, payload.group_id, &payload.item_ids)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(requirements))
}

// PATCH /api/inventory/requirements/{requirement_id}
#[utoipa::path(
    patch,
    path = "/api/inventory/requirements/{requirement_id}",
    tag = "Inventory",
    request_body = UpdateRequirementPayload,
    responses(
        (status = 200, description = "Item atualizado", body = InventoryRequirement),
        (status = 404, description = "Item ou grupo não encontrado")
    ),
    params(
        ("requirement_id" = Uuid, Path, description = "ID do item"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_requirement(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(requirement_id): Path<Uuid>,
    Json(payload): Json<UpdateRequirementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    ensure_rate_not_negative(payload.consume_per_hour.flatten()).localized(&locale, &app_state.i18n_store)?;

    let patch = RequirementPatch {
        parent_group_id: payload.parent_group_id,
        item_name: payload.item_name.as_deref().map(str::trim),
        required_quantity: payload.required_quantity,
        category: payload.category.as_ref().map(Option::as_deref),
        critical: payload.critical,
        notes: payload.notes.as_ref().map(Option::as_deref),
        auto_consume_enabled: payload.auto_consume_enabled,
        consume_per_hour: payload.consume_per_hour,
    };

    let requirement = app_state
        .inventory_service
        .update_requirement(&ctx, requirement_id, &patch)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(requirement))
}

// DELETE /api/inventory/requirements/{requirement_id}
#[utoipa::path(
    delete,
    path = "/api/inventory/requirements/{requirement_id}",
    tag = "Inventory",
    responses(
        (status = 204, description = "Item removido"),
        (status = 404, description = "Item não encontrado")
    ),
    params(
        ("requirement_id" = Uuid, Path, description = "ID do item"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_requirement(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(requirement_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .inventory_service
        .delete_requirement(&ctx, requirement_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/inventory/requirements/{requirement_id}/history
#[utoipa::path(
    get,
    path = "/api/inventory/requirements/{requirement_id}/history",
    tag = "Inventory",
    responses((status = 200, description = "Linhas de conferência, mais recentes primeiro", body = Vec<RequirementHistoryEntry>)),
    params(
        ("requirement_id" = Uuid, Path, description = "ID do item"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn requirement_history(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(requirement_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let history = app_state
        .inventory_service
        .history(&ctx, requirement_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(history))
}

// =============================================================================
//  ÁREA 3: AJUSTES DE ESTOQUE
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    // Com sinal: negativo retira do estoque
    #[schema(example = -2)]
    pub delta: i32,

    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

// GET /api/inventory/requirements/{requirement_id}/adjustments
#[utoipa::path(
    get,
    path = "/api/inventory/requirements/{requirement_id}/adjustments",
    tag = "Inventory",
    responses((status = 200, description = "Trilha de auditoria do item", body = Vec<InventoryAdjustment>)),
    params(
        ("requirement_id" = Uuid, Path, description = "ID do item"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_adjustments(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(requirement_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let adjustments = app_state
        .inventory_service
        .list_adjustments(&ctx, requirement_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(adjustments))
}

// POST /api/inventory/requirements/{requirement_id}/adjustments
#[utoipa::path(
    post,
    path = "/api/inventory/requirements/{requirement_id}/adjustments",
    tag = "Inventory",
    request_body = AdjustStockPayload,
    responses(
        (status = 201, description = "Ajuste manual registrado", body = InventoryAdjustment),
        (status = 400, description = "Estoque ficaria negativo")
    ),
    params(
        ("requirement_id" = Uuid, Path, description = "ID do item"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermEditInventory>,
    Path(requirement_id): Path<Uuid>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let adjustment = app_state
        .inventory_service
        .adjust_stock(&ctx, requirement_id, payload.delta, payload.note.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(adjustment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_consumption_rate_is_rejected() {
        assert!(ensure_rate_not_negative(None).is_ok());
        assert!(ensure_rate_not_negative(Some(Decimal::ZERO)).is_ok());
        assert!(ensure_rate_not_negative(Some(Decimal::new(15, 1))).is_ok());
        assert!(matches!(
            ensure_rate_not_negative(Some(Decimal::new(-1, 0))),
            Err(AppError::RuleViolation(_))
        ));
    }

    #[test]
    fn requirement_patch_keeps_null_and_absent_apart() {
        let payload: UpdateRequirementPayload =
            serde_json::from_str(r#"{"parentGroupId": null, "itemName": "Flares"}"#).unwrap();
        assert_eq!(payload.parent_group_id, Some(None));
        assert_eq!(payload.consume_per_hour, None);
        assert_eq!(payload.item_name.as_deref(), Some("Flares"));
    }
}
