// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "en";

// Catálogo (chave, inglês, português).
// Códigos de validação (required, length, ...) e regras de negócio também passam por aqui.
const CATALOG: &[(&str, &str, &str)] = &[
    // --- Erros gerais ---
    ("error.validation", "One or more fields are invalid.", "Um ou mais campos são inválidos."),
    ("error.invalid_token", "Invalid or missing authentication token.", "Token de autenticação inválido ou ausente."),
    ("error.org_header_missing", "The x-org-id header is required.", "O cabeçalho x-org-id é obrigatório."),
    ("error.org_header_invalid", "The x-org-id header must be a valid UUID.", "O cabeçalho x-org-id precisa ser um UUID válido."),
    ("error.not_org_member", "You are not an active member of this organization.", "Você não é um membro ativo desta organização."),
    ("error.org_inactive", "This organization is inactive.", "Esta organização está inativa."),
    ("error.insufficient_role", "Your role does not allow this action.", "Seu cargo não permite esta ação."),
    ("error.super_admin_required", "Super admin access required.", "Acesso de super administrador necessário."),
    ("error.org_mismatch", "The organization in the path does not match the selected organization.", "A organização do caminho não corresponde à organização selecionada."),
    ("error.invite_email_mismatch", "This invite was sent to a different e-mail address.", "Este convite foi enviado para outro e-mail."),
    ("error.not_found", "{entity} not found.", "{entity} não encontrado(a)."),
    ("error.org_name_exists", "You already have an organization with this name.", "Você já possui uma organização com este nome."),
    ("error.already_member", "This user is already a member of the organization.", "Este usuário já é membro da organização."),
    ("error.pending_invite_exists", "A pending invite already exists for this e-mail.", "Já existe um convite pendente para este e-mail."),
    ("error.pending_request_exists", "You already have a pending organization request.", "Você já possui uma solicitação de organização pendente."),
    ("error.already_has_org", "You already belong to an organization.", "Você já pertence a uma organização."),
    ("error.vessel_limit_reached", "Vessel limit reached ({limit}). Add vessel packs to your subscription.", "Limite de embarcações atingido ({limit}). Adicione pacotes à sua assinatura."),
    ("error.invite_accepted", "This invite has already been accepted.", "Este convite já foi aceito."),
    ("error.invite_revoked", "This invite has been revoked.", "Este convite foi revogado."),
    ("error.invite_expired", "This invite has expired.", "Este convite expirou."),
    ("error.request_reviewed", "This request has already been reviewed.", "Esta solicitação já foi analisada."),
    ("error.cannot_modify_self", "You cannot change your own membership.", "Você não pode alterar sua própria associação."),
    ("error.check_not_editable", "This inventory check has already been submitted.", "Esta conferência de estoque já foi enviada."),
    ("error.no_subscription", "No active subscription found.", "Nenhuma assinatura ativa encontrada."),
    ("error.no_billing_customer", "No billing account found for this organization.", "Nenhuma conta de cobrança encontrada para esta organização."),
    ("error.invalid_webhook_signature", "Invalid webhook signature.", "Assinatura do webhook inválida."),
    ("error.invalid_webhook_payload", "Invalid webhook payload.", "Conteúdo do webhook inválido."),
    ("error.billing_not_configured", "Billing is not configured.", "A cobrança não está configurada."),
    ("error.billing_provider", "The billing provider could not complete the request.", "O provedor de cobrança não conseguiu concluir a solicitação."),
    ("error.internal", "An unexpected error occurred.", "Ocorreu um erro inesperado."),

    // --- Entidades ---
    ("entity.organization", "Organization", "Organização"),
    ("entity.member", "Member", "Membro"),
    ("entity.invite", "Invite", "Convite"),
    ("entity.org_request", "Organization request", "Solicitação de organização"),
    ("entity.vessel", "Vessel", "Embarcação"),
    ("entity.inventory_group", "Inventory group", "Grupo de estoque"),
    ("entity.requirement", "Inventory requirement", "Item de estoque"),
    ("entity.inventory_check", "Inventory check", "Conferência de estoque"),
    ("entity.check_line", "Inventory check line", "Linha de conferência"),
    ("entity.maintenance_task", "Maintenance task", "Tarefa de manutenção"),
    ("entity.trip", "Trip", "Viagem"),

    // --- Códigos de validação ---
    ("required", "This field is required.", "Este campo é obrigatório."),
    ("length", "Invalid length.", "Tamanho inválido."),
    ("range", "Value out of range.", "Valor fora do intervalo permitido."),
    ("email", "Invalid e-mail address.", "E-mail inválido."),
    ("must_not_be_negative", "Value must not be negative.", "O valor não pode ser negativo."),
    ("must_be_positive", "Value must be greater than zero.", "O valor precisa ser maior que zero."),
    ("interval_required", "interval_days or interval_hours is required for INTERVAL cadence.", "interval_days ou interval_hours é obrigatório para a cadência INTERVAL."),
    ("due_date_required", "due_date is required for SPECIFIC_DATE cadence.", "due_date é obrigatório para a cadência SPECIFIC_DATE."),
    ("reorder_mismatch", "The list must contain exactly the current ids.", "A lista precisa conter exatamente os ids atuais."),
    ("reorder_duplicates", "The list contains duplicated ids.", "A lista contém ids duplicados."),
    ("requirement_not_in_vessel", "The requirement does not belong to this vessel.", "O item não pertence a esta embarcação."),
    ("negative_stock", "The adjustment would make the stock negative.", "O ajuste deixaria o estoque negativo."),
    ("zero_delta", "The adjustment must change the quantity.", "O ajuste precisa alterar a quantidade."),
    ("invalid_review_status", "Status must be APPROVED or REJECTED.", "O status precisa ser APPROVED ou REJECTED."),
];

/// Mensagens traduzidas por idioma. Idiomas desconhecidos caem no inglês.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut en = HashMap::new();
        let mut pt = HashMap::new();
        for (key, en_text, pt_text) in CATALOG {
            en.insert(*key, *en_text);
            pt.insert(*key, *pt_text);
        }

        let mut messages = HashMap::new();
        messages.insert("en", en);
        messages.insert("pt", pt);
        Self { messages }
    }

    pub fn lookup(&self, lang: &str, key: &str) -> Option<&'static str> {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .copied()
    }

    /// Traduz a chave; se não existir, devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key).unwrap_or(key).to_string()
    }

    /// Traduz e substitui os placeholders `{nome}`.
    pub fn translate_with(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.translate(lang, key);
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_for_unknown_language() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "error.internal"), "An unexpected error occurred.");
    }

    #[test]
    fn translates_portuguese_with_placeholders() {
        let store = I18nStore::new();
        let msg = store.translate_with("pt", "error.vessel_limit_reached", &[("limit", "8")]);
        assert!(msg.starts_with("Limite de embarcações atingido (8)"));
    }

    #[test]
    fn unknown_key_is_returned_as_is() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "something_else"), "something_else");
    }

    #[test]
    fn every_key_has_both_languages() {
        let store = I18nStore::new();
        for (key, _, _) in CATALOG {
            assert!(store.messages["en"].contains_key(key));
            assert!(store.messages["pt"].contains_key(key));
        }
    }
}
