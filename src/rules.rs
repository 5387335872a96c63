// src/rules.rs
//
// Regras de negócio puras: não tocam no banco nem em HTTP.
// Os services carregam os dados, chamam as regras e persistem o resultado.

pub mod consumption;
pub mod entitlement;
pub mod maintenance;
pub mod ordering;
pub mod permissions;

use thiserror::Error;

/// Violação de regra, sempre ligada a um campo do payload.
/// `code` é uma chave do catálogo de mensagens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {code}")]
pub struct RuleError {
    pub field: &'static str,
    pub code: &'static str,
}

impl RuleError {
    pub fn new(field: &'static str, code: &'static str) -> Self {
        Self { field, code }
    }
}
