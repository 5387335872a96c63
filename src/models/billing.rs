// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedirectUrl {
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_123")]
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackUpdateResult {
    #[schema(example = "success")]
    pub status: String,
    pub pack_quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatus {
    #[schema(example = "base")]
    pub plan: Option<String>,
    #[schema(example = "active")]
    pub status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub addon_pack_quantity: i32,
    #[schema(example = 3)]
    pub base_vessels_included: i32,
    #[schema(example = 5)]
    pub vessels_per_pack: i32,
    // Limite gravado pelo webhook
    pub vessel_limit: Option<i32>,
    // Limite efetivo (considera o override)
    pub effective_vessel_limit: Option<i32>,
    pub vessel_count: i64,
    pub override_active: bool,
    pub override_vessel_limit: Option<i32>,
    pub override_expires_at: Option<DateTime<Utc>>,
    pub override_reason: Option<String>,
}

// Resposta do webhook: erros de processamento voltam 200 para o provedor não reenviar.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    #[schema(example = "success")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self { status: "success".to_string(), message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".to_string(), message: Some(message.into()) }
    }
}
