// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError, Localize},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

// Valida o Bearer token e deixa o usuário nas extensions da requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());

    let Some(token) = bearer_token(request.headers()) else {
        return Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store));
    };

    let user = app_state
        .auth_service
        .validate_token(&token)
        .await
        .localized(&locale, &app_state.i18n_store)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_owned())
        .filter(|token| !token.is_empty())
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn reads_the_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn ignores_other_schemes_and_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
    }
}
