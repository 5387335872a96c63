// src/integrations/mailer.rs

use async_trait::async_trait;
use serde_json::json;

use crate::integrations::{check_status, ProviderError};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), ProviderError>;
}

pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Sem RESEND_API_KEY: só registra no log (desenvolvimento).
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), ProviderError> {
        tracing::info!("📧 [dev] e-mail para {}: {}\n{}", email.to, email.subject, email.html);
        Ok(())
    }
}
