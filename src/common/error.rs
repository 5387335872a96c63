// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    integrations::ProviderError,
    middleware::i18n::Locale,
    rules::RuleError,
};

// Erro interno da aplicação. Os handlers convertem para `ApiError` (já traduzido).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Regra de negócio violada: {0}")]
    RuleViolation(#[from] RuleError),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Cabeçalho x-org-id ausente")]
    OrgHeaderMissing,

    #[error("Cabeçalho x-org-id inválido")]
    OrgHeaderInvalid,

    #[error("Usuário não é membro ativo da organização")]
    NotOrgMember,

    #[error("Organização inativa")]
    OrgInactive,

    #[error("Cargo sem permissão para a ação")]
    InsufficientRole,

    #[error("Acesso de super admin necessário")]
    SuperAdminRequired,

    #[error("Organização do caminho difere do contexto")]
    OrgMismatch,

    #[error("E-mail do convite não confere")]
    InviteEmailMismatch,

    // O &'static str é a entidade (ex: "vessel"), usada na tradução.
    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Nome de organização já existe")]
    OrgNameAlreadyExists,

    #[error("Usuário já é membro")]
    AlreadyMember,

    #[error("Convite pendente já existe")]
    PendingInviteExists,

    #[error("Solicitação pendente já existe")]
    PendingRequestExists,

    #[error("Usuário já pertence a uma organização")]
    AlreadyHasOrganization,

    #[error("Limite de embarcações atingido ({0})")]
    VesselLimitReached(i32),

    #[error("Convite já aceito")]
    InviteAlreadyAccepted,

    #[error("Convite revogado")]
    InviteRevoked,

    #[error("Convite expirado")]
    InviteExpired,

    #[error("Solicitação já analisada")]
    RequestAlreadyReviewed,

    #[error("Não é possível alterar a própria associação")]
    CannotModifySelf,

    #[error("Conferência não está em andamento")]
    CheckNotEditable,

    #[error("Sem assinatura ativa")]
    NoActiveSubscription,

    #[error("Sem cliente de cobrança")]
    NoBillingCustomer,

    #[error("Assinatura do webhook inválida")]
    InvalidWebhookSignature,

    #[error("Conteúdo do webhook inválido: {0}")]
    InvalidWebhookPayload(String),

    #[error("Cobrança não configurada: {0}")]
    BillingNotConfigured(&'static str),

    #[error("Erro do provedor externo: {0}")]
    ProviderError(#[from] ProviderError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// O erro que vai para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::RuleViolation(_)
            | AppError::OrgHeaderMissing
            | AppError::OrgHeaderInvalid
            | AppError::InviteAlreadyAccepted
            | AppError::InviteRevoked
            | AppError::InviteExpired
            | AppError::RequestAlreadyReviewed
            | AppError::CannotModifySelf
            | AppError::CheckNotEditable
            | AppError::NoActiveSubscription
            | AppError::NoBillingCustomer
            | AppError::InvalidWebhookSignature
            | AppError::InvalidWebhookPayload(_) => StatusCode::BAD_REQUEST,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::NotOrgMember
            | AppError::OrgInactive
            | AppError::InsufficientRole
            | AppError::SuperAdminRequired
            | AppError::OrgMismatch
            | AppError::InviteEmailMismatch => StatusCode::FORBIDDEN,

            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::OrgNameAlreadyExists
            | AppError::AlreadyMember
            | AppError::PendingInviteExists
            | AppError::PendingRequestExists
            | AppError::AlreadyHasOrganization
            | AppError::VesselLimitReached(_) => StatusCode::CONFLICT,

            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,

            AppError::BillingNotConfigured(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::RuleViolation(_) => "error.validation",
            AppError::InvalidToken => "error.invalid_token",
            AppError::OrgHeaderMissing => "error.org_header_missing",
            AppError::OrgHeaderInvalid => "error.org_header_invalid",
            AppError::NotOrgMember => "error.not_org_member",
            AppError::OrgInactive => "error.org_inactive",
            AppError::InsufficientRole => "error.insufficient_role",
            AppError::SuperAdminRequired => "error.super_admin_required",
            AppError::OrgMismatch => "error.org_mismatch",
            AppError::InviteEmailMismatch => "error.invite_email_mismatch",
            AppError::NotFound(_) => "error.not_found",
            AppError::OrgNameAlreadyExists => "error.org_name_exists",
            AppError::AlreadyMember => "error.already_member",
            AppError::PendingInviteExists => "error.pending_invite_exists",
            AppError::PendingRequestExists => "error.pending_request_exists",
            AppError::AlreadyHasOrganization => "error.already_has_org",
            AppError::VesselLimitReached(_) => "error.vessel_limit_reached",
            AppError::InviteAlreadyAccepted => "error.invite_accepted",
            AppError::InviteRevoked => "error.invite_revoked",
            AppError::InviteExpired => "error.invite_expired",
            AppError::RequestAlreadyReviewed => "error.request_reviewed",
            AppError::CannotModifySelf => "error.cannot_modify_self",
            AppError::CheckNotEditable => "error.check_not_editable",
            AppError::NoActiveSubscription => "error.no_subscription",
            AppError::NoBillingCustomer => "error.no_billing_customer",
            AppError::InvalidWebhookSignature => "error.invalid_webhook_signature",
            AppError::InvalidWebhookPayload(_) => "error.invalid_webhook_payload",
            AppError::BillingNotConfigured(_) => "error.billing_not_configured",
            AppError::ProviderError(_) => "error.billing_provider",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "error.internal",
        }
    }

    /// Converte para o erro de resposta, traduzido no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("🔥 Erro interno: {}", self);
        } else if status == StatusCode::BAD_GATEWAY {
            tracing::warn!("Falha no provedor externo: {}", self);
        }

        let error = match self {
            AppError::NotFound(entity) => {
                let entity_name = store.translate(lang, &format!("entity.{}", entity));
                store.translate_with(lang, "error.not_found", &[("entity", &entity_name)])
            }
            AppError::VesselLimitReached(limit) => store.translate_with(
                lang,
                "error.vessel_limit_reached",
                &[("limit", &limit.to_string())],
            ),
            other => store.translate(lang, other.message_key()),
        };

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| match store.lookup(lang, &e.code) {
                            Some(text) => text.to_string(),
                            None => e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string()),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::RuleViolation(rule) => {
                Some(json!({ rule.field: [store.translate(lang, rule.code)] }))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

// Usado onde não há `Locale` disponível (ex: extratores). Responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let store = I18nStore::new();
        self.to_api_error(&Locale(DEFAULT_LANG.to_string()), &store)
            .into_response()
    }
}

/// Atalho usado nos handlers: `.localized(&locale, &app_state.i18n_store)`.
pub trait Localize<T> {
    fn localized(self, locale: &Locale, store: &I18nStore) -> Result<T, ApiError>;
}

impl<T> Localize<T> for Result<T, AppError> {
    fn localized(self, locale: &Locale, store: &I18nStore) -> Result<T, ApiError> {
        self.map_err(|e| e.to_api_error(locale, store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn not_found_is_404_and_names_the_entity() {
        let store = I18nStore::new();
        let api = AppError::NotFound("vessel").to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.error, "Vessel not found.");
        assert!(api.details.is_none());
    }

    #[test]
    fn validation_errors_carry_translated_field_details() {
        let store = I18nStore::new();
        let mut errors = ValidationErrors::new();
        errors.add("name", ValidationError::new("required"));

        let api = AppError::ValidationError(errors).to_api_error(&pt(), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "Um ou mais campos são inválidos.");
        let details = api.details.expect("details");
        assert_eq!(details["name"][0], "Este campo é obrigatório.");
    }

    #[test]
    fn rule_violation_is_a_field_level_400() {
        let store = I18nStore::new();
        let err = AppError::from(RuleError::new("interval_days", "interval_required"));
        let api = err.to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert!(details["interval_days"][0].as_str().unwrap_or_default().contains("INTERVAL"));
    }

    #[test]
    fn status_mapping_by_category() {
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InsufficientRole.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InviteEmailMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::PendingInviteExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::InviteExpired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ProviderError(ProviderError::Unexpected("x".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::BillingNotConfigured("STRIPE_SECRET_KEY").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let store = I18nStore::new();
        let api = AppError::InternalServerError(anyhow::anyhow!("segredo"))
            .to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
    }
}
