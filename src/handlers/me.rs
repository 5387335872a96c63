// src/handlers/me.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::{ApiError, Localize},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::MeResponse,
};

// GET /api/me
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado e suas organizações", body = MeResponse),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let me = app_state
        .auth_service
        .me(user)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    Ok(Json(me))
}
