// src/handlers/trips.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
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
        rbac::{PermLogTrips, RequirePermission},
        tenancy::OrgContext,
    },
    models::trips::{TotalHours, TripLogged, VesselTrip},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TripListQuery {
    /// Padrão 50, máximo 200
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogTripPayload {
    #[schema(value_type = f64, example = 4.5)]
    pub hours: Decimal,

    // Padrão: agora
    pub logged_at: Option<DateTime<Utc>>,

    #[validate(length(max = 1000))]
    #[schema(example = "Sunset cruise")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTripPayload {
    #[schema(value_type = Option<f64>)]
    pub hours: Option<Decimal>,
    pub logged_at: Option<DateTime<Utc>>,

    // `null` apaga a observação
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 1000))]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

// GET /api/vessels/{vessel_id}/trips
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/trips",
    tag = "Trips",
    responses((status = 200, description = "Viagens, mais recentes primeiro", body = Vec<VesselTrip>)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        TripListQuery,
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_trips(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
    Query(query): Query<TripListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let trips = app_state
        .trip_service
        .list(&ctx, vessel_id, query.limit)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(trips))
}

// POST /api/vessels/{vessel_id}/trips
#[utoipa::path(
    post,
    path = "/api/vessels/{vessel_id}/trips",
    tag = "Trips",
    request_body = LogTripPayload,
    responses(
        (status = 201, description = "Viagem registrada com o consumo automático aplicado", body = TripLogged),
        (status = 400, description = "Horas precisam ser maiores que zero")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn log_trip(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermLogTrips>,
    Path(vessel_id): Path<Uuid>,
    Json(payload): Json<LogTripPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let logged = app_state
        .trip_service
        .log_trip(&ctx, vessel_id, payload.hours, payload.logged_at, payload.note.as_deref())
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok((StatusCode::CREATED, Json(logged)))
}

// PATCH /api/vessels/{vessel_id}/trips/{trip_id}
#[utoipa::path(
    patch,
    path = "/api/vessels/{vessel_id}/trips/{trip_id}",
    tag = "Trips",
    request_body = UpdateTripPayload,
    responses(
        (status = 200, description = "Viagem atualizada (consumo não é reaplicado)", body = VesselTrip),
        (status = 404, description = "Viagem não encontrada")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("trip_id" = Uuid, Path, description = "ID da viagem"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_trip(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermLogTrips>,
    Path((vessel_id, trip_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTripPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let trip = app_state
        .trip_service
        .update(
            &ctx,
            vessel_id,
            trip_id,
            payload.hours,
            payload.logged_at,
            payload.note.as_ref().map(Option::as_deref),
        )
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(trip))
}

// DELETE /api/vessels/{vessel_id}/trips/{trip_id}
#[utoipa::path(
    delete,
    path = "/api/vessels/{vessel_id}/trips/{trip_id}",
    tag = "Trips",
    responses(
        (status = 204, description = "Viagem removida; os ajustes continuam na auditoria"),
        (status = 404, description = "Viagem não encontrada")
    ),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("trip_id" = Uuid, Path, description = "ID da viagem"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_trip(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    _perm: RequirePermission<PermLogTrips>,
    Path((vessel_id, trip_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .trip_service
        .delete(&ctx, vessel_id, trip_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/vessels/{vessel_id}/total-hours
#[utoipa::path(
    get,
    path = "/api/vessels/{vessel_id}/total-hours",
    tag = "Trips",
    responses((status = 200, description = "Soma das horas de viagem", body = TotalHours)),
    params(
        ("vessel_id" = Uuid, Path, description = "ID da embarcação"),
        ("x-org-id" = Uuid, Header, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn total_hours(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: OrgContext,
    Path(vessel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let total = app_state
        .trip_service
        .total_hours(&ctx, vessel_id)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_patch_can_clear_the_note() {
        let cleared: UpdateTripPayload = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));

        let untouched: UpdateTripPayload = serde_json::from_str(r#"{"hours": 2.5}"#).unwrap();
        assert_eq!(untouched.note, None);
        assert_eq!(untouched.hours, Some(Decimal::new(25, 1)));
    }
}
