// src/integrations.rs
//
// Colaboradores externos: provedor de cobrança (Stripe) e envio de e-mail (Resend).

pub mod mailer;
pub mod stripe;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("falha de comunicação: {0}")]
    Http(#[from] reqwest::Error),

    #[error("resposta {status} do provedor: {body}")]
    Status { status: u16, body: String },

    #[error("resposta inesperada: {0}")]
    Unexpected(String),
}

/// Transforma respostas não-2xx em `ProviderError::Status`, guardando o corpo para o log.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}
