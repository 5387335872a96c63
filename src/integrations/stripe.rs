// src/integrations/stripe.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::integrations::{check_status, ProviderError};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Janela aceita entre o timestamp assinado e o relógio local.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

// --- Objetos do provedor (só os campos que usamos) ---

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub quantity: Option<i64>,
    pub price: Price,
    // Versões novas da API movem o período para o item.
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl Subscription {
    /// `org_id` gravado no metadata no checkout.
    pub fn org_id(&self) -> Option<Uuid> {
        self.metadata.get("org_id").and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .or_else(|| self.items.data.iter().find_map(|item| item.current_period_end))
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn line_items(&self) -> impl Iterator<Item = (&str, Option<i64>)> {
        self.items
            .data
            .iter()
            .map(|item| (item.price.id.as_str(), item.quantity))
    }

    pub fn item_with_price(&self, price_id: &str) -> Option<&SubscriptionItem> {
        self.items.data.iter().find(|item| item.price.id == price_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WithUrl {
    url: String,
}

// --- Pedido de checkout ---

pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub org_id: Uuid,
    /// (price_id, quantidade)
    pub line_items: Vec<(&'a str, i32)>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_customer(&self, org_name: &str, org_id: Uuid) -> Result<String, ProviderError>;

    /// Retorna a URL do checkout.
    async fn create_checkout_session(&self, request: &CheckoutRequest<'_>) -> Result<String, ProviderError>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription, ProviderError>;

    async fn update_subscription_item(&self, item_id: &str, quantity: i32) -> Result<(), ProviderError>;

    async fn create_subscription_item(
        &self,
        subscription_id: &str,
        price_id: &str,
        quantity: i32,
    ) -> Result<(), ProviderError>;

    async fn delete_subscription_item(&self, item_id: &str) -> Result<(), ProviderError>;

    /// Retorna a URL do portal do cliente.
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, ProviderError>;
}

/// Cliente REST (form-encoded, autenticação por chave secreta).
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }

    async fn post_form(&self, path: &str, params: &[(String, String)]) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .form(params)
            .send()
            .await?;
        check_status(response).await
    }
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Parâmetros do checkout no formato de formulário aninhado do provedor.
fn checkout_params(request: &CheckoutRequest<'_>) -> Vec<(String, String)> {
    let mut params = vec![
        param("mode", "subscription"),
        param("customer", request.customer_id),
        param("success_url", request.success_url),
        param("cancel_url", request.cancel_url),
        param("allow_promotion_codes", "true"),
        param("metadata[org_id]", request.org_id),
        param("subscription_data[metadata][org_id]", request.org_id),
    ];
    for (index, (price_id, quantity)) in request.line_items.iter().enumerate() {
        params.push(param(&format!("line_items[{}][price]", index), price_id));
        params.push(param(&format!("line_items[{}][quantity]", index), quantity));
    }
    params
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_customer(&self, org_name: &str, org_id: Uuid) -> Result<String, ProviderError> {
        let params = vec![param("name", org_name), param("metadata[org_id]", org_id)];
        let created: Created = self.post_form("/customers", &params).await?.json().await?;
        Ok(created.id)
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest<'_>) -> Result<String, ProviderError> {
        let session: CheckoutSession = self
            .post_form("/checkout/sessions", &checkout_params(request))
            .await?
            .json()
            .await?;
        session
            .url
            .ok_or_else(|| ProviderError::Unexpected(format!("checkout {} sem url", session.id)))
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription, ProviderError> {
        let response = self
            .http
            .get(format!("{}/subscriptions/{}", API_BASE, subscription_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn update_subscription_item(&self, item_id: &str, quantity: i32) -> Result<(), ProviderError> {
        self.post_form(
            &format!("/subscription_items/{}", item_id),
            &[param("quantity", quantity)],
        )
        .await?;
        Ok(())
    }

    async fn create_subscription_item(
        &self,
        subscription_id: &str,
        price_id: &str,
        quantity: i32,
    ) -> Result<(), ProviderError> {
        let params = vec![
            param("subscription", subscription_id),
            param("price", price_id),
            param("quantity", quantity),
        ];
        self.post_form("/subscription_items", &params).await?;
        Ok(())
    }

    async fn delete_subscription_item(&self, item_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(format!("{}/subscription_items/{}", API_BASE, item_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, ProviderError> {
        let params = vec![param("customer", customer_id), param("return_url", return_url)];
        let portal: WithUrl = self
            .post_form("/billing_portal/sessions", &params)
            .await?
            .json()
            .await?;
        Ok(portal.url)
    }
}

// --- Assinatura do webhook ---

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("cabeçalho sem timestamp")]
    MissingTimestamp,
    #[error("cabeçalho sem assinatura v1")]
    MissingSignature,
    #[error("timestamp fora da tolerância")]
    Expired,
    #[error("assinatura não confere")]
    Mismatch,
}

/// Valida `Stripe-Signature: t=<unix>,v1=<hex>[,v1=...]` sobre `"{t}.{payload}"`.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    // `t` vem do cabeçalho: abs_diff não estoura com valores extremos
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let matches = signatures.iter().any(|signature| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    });

    if matches {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
pub(crate) fn sign_for_tests(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"customer.subscription.updated"}"#;

    #[test]
    fn accepts_a_valid_signature() {
        let header = sign_for_tests(BODY, SECRET, 1_700_000_000);
        assert_eq!(verify_webhook_signature(BODY, &header, SECRET, 1_700_000_100), Ok(()));
    }

    #[test]
    fn accepts_when_any_v1_matches() {
        let valid = sign_for_tests(BODY, SECRET, 1_700_000_000);
        let header = format!("{},v1={}", valid, "00".repeat(32));
        assert_eq!(verify_webhook_signature(BODY, &header, SECRET, 1_700_000_000), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign_for_tests(BODY, SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(b"{}", &header, SECRET, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_webhook_signature(BODY, &header, "whsec_other", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamps() {
        let header = sign_for_tests(BODY, SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(BODY, &header, SECRET, 1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired_not_a_crash() {
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1=00", t);
            assert_eq!(
                verify_webhook_signature(BODY, &header, SECRET, 1_760_000_000),
                Err(SignatureError::Expired)
            );
        }
        assert_eq!(
            verify_webhook_signature(BODY, "t=-9223372036854775808,v1=00", SECRET, i64::MAX),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(
            verify_webhook_signature(BODY, "v1=abcd", SECRET, 0),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_webhook_signature(BODY, "t=0", SECRET, 0),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn checkout_params_carry_org_metadata_and_line_items() {
        let org_id = Uuid::new_v4();
        let request = CheckoutRequest {
            customer_id: "cus_1",
            org_id,
            line_items: vec![("price_base", 1), ("price_pack", 2)],
            success_url: "http://web/settings/billing?success=1",
            cancel_url: "http://web/settings/billing?canceled=1",
        };
        let params = checkout_params(&request);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("mode").as_deref(), Some("subscription"));
        assert_eq!(get("subscription_data[metadata][org_id]"), Some(org_id.to_string()));
        assert_eq!(get("line_items[1][price]").as_deref(), Some("price_pack"));
        assert_eq!(get("line_items[1][quantity]").as_deref(), Some("2"));
        assert_eq!(get("allow_promotion_codes").as_deref(), Some("true"));
    }

    #[test]
    fn subscription_helpers_read_metadata_and_items() {
        let org_id = Uuid::new_v4();
        let sub: Subscription = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "metadata": { "org_id": org_id.to_string() },
            "items": { "data": [
                { "id": "si_1", "quantity": 1, "price": { "id": "price_base" }, "current_period_end": 1_700_000_000 },
                { "id": "si_2", "quantity": 3, "price": { "id": "price_pack" } }
            ]}
        }))
        .expect("subscription json");

        assert_eq!(sub.org_id(), Some(org_id));
        assert_eq!(sub.period_end().map(|d| d.timestamp()), Some(1_700_000_000));
        assert_eq!(sub.item_with_price("price_pack").map(|i| i.id.as_str()), Some("si_2"));
        assert_eq!(sub.line_items().count(), 2);
    }
}
