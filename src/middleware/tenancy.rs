// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError, Localize},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{auth::User, organization::OrgRole},
};

// O nome do nosso cabeçalho HTTP customizado
pub const ORG_ID_HEADER: &str = "x-org-id";

/// Contexto de uma requisição dentro de uma organização.
/// Resolvido uma vez pelo `tenant_guard` e passado explicitamente aos serviços.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user: User,
    pub org_id: Uuid,
    pub role: OrgRole,
}

impl OrgContext {
    /// Rotas com `{org_id}` no caminho precisam bater com o cabeçalho.
    pub fn ensure_org(&self, path_org_id: Uuid) -> Result<(), AppError> {
        if self.org_id == path_org_id {
            Ok(())
        } else {
            Err(AppError::OrgMismatch)
        }
    }
}

pub fn parse_org_header(value: Option<&axum::http::HeaderValue>) -> Result<Uuid, AppError> {
    let value = value.ok_or(AppError::OrgHeaderMissing)?;
    let raw = value.to_str().map_err(|_| AppError::OrgHeaderInvalid)?;
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::OrgHeaderInvalid)
}

// Roda depois do auth_guard: exige associação ACTIVE numa organização ativa.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());
    let store = &app_state.i18n_store;

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::InvalidToken)
        .localized(&locale, store)?;

    let org_id = parse_org_header(request.headers().get(ORG_ID_HEADER)).localized(&locale, store)?;

    let context = app_state
        .org_service
        .resolve_context(user.0, org_id)
        .await
        .localized(&locale, store)?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrgContext>()
            .cloned()
            .ok_or(AppError::OrgHeaderMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_parsing() {
        let id = Uuid::new_v4();
        let value = HeaderValue::from_str(&id.to_string()).expect("header");
        assert_eq!(parse_org_header(Some(&value)).ok(), Some(id));

        assert!(matches!(parse_org_header(None), Err(AppError::OrgHeaderMissing)));
        let bad = HeaderValue::from_static("not-a-uuid");
        assert!(matches!(parse_org_header(Some(&bad)), Err(AppError::OrgHeaderInvalid)));
    }
}
