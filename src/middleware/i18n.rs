// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::common::i18n::DEFAULT_LANG;

// Idioma do cliente (primeira tag do Accept-Language, sem a região)
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Locale {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let lang = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .first() // ex: "pt-BR"
                    .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            })
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Locale(lang)
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn picks_the_primary_subtag_of_the_preferred_language() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,en;q=0.8"));
        assert_eq!(Locale::from_headers(&headers).0, "pt");
    }

    #[test]
    fn defaults_to_english() {
        assert_eq!(Locale::from_headers(&HeaderMap::new()).0, "en");
    }
}
