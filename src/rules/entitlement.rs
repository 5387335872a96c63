// src/rules/entitlement.rs
//
// Limite de embarcações: assinatura (base + pacotes) e override manual.

use chrono::{DateTime, Utc};

use crate::models::organization::Organization;

pub const PLAN_BASE: &str = "base";

/// Parâmetros do plano (env BASE_VESSELS_INCLUDED / VESSELS_PER_PACK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanPricing {
    pub base_vessels_included: i32,
    pub vessels_per_pack: i32,
}

impl Default for PlanPricing {
    fn default() -> Self {
        Self {
            base_vessels_included: 3,
            vessels_per_pack: 5,
        }
    }
}

/// Resultado da leitura dos itens de uma assinatura.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPlan {
    pub plan: Option<String>,
    pub addon_pack_quantity: i32,
}

/// Lê os itens (price_id, quantidade): o preço base define o plano,
/// o preço do pacote define a quantidade de pacotes (0 se ausente).
pub fn parse_line_items<'a, I>(
    items: I,
    base_price_id: Option<&str>,
    pack_price_id: Option<&str>,
) -> ParsedPlan
where
    I: IntoIterator<Item = (&'a str, Option<i64>)>,
{
    let mut parsed = ParsedPlan::default();
    for (price_id, quantity) in items {
        if Some(price_id) == base_price_id {
            parsed.plan = Some(PLAN_BASE.to_string());
        } else if Some(price_id) == pack_price_id {
            parsed.addon_pack_quantity = quantity
                .unwrap_or(0)
                .clamp(0, i64::from(i32::MAX)) as i32;
        }
    }
    parsed
}

/// Limite da assinatura. Sem plano reconhecido: `None` (sem limite aplicado).
pub fn subscription_vessel_limit(
    plan: Option<&str>,
    addon_pack_quantity: i32,
    pricing: PlanPricing,
) -> Option<i32> {
    plan.filter(|p| !p.is_empty()).map(|_| {
        pricing
            .base_vessels_included
            .saturating_add(addon_pack_quantity.max(0).saturating_mul(pricing.vessels_per_pack))
    })
}

/// Override ativo: habilitado e (sem expiração ou expiração no futuro).
pub fn override_active(
    enabled: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    enabled && expires_at.is_none_or(|expires| expires > now)
}

pub fn effective_vessel_limit(
    org: &Organization,
    pricing: PlanPricing,
    now: DateTime<Utc>,
) -> Option<i32> {
    let from_subscription = subscription_vessel_limit(
        org.subscription_plan.as_deref(),
        org.addon_pack_quantity,
        pricing,
    );

    if override_active(org.billing_override_enabled, org.billing_override_expires_at, now) {
        org.billing_override_vessel_limit.or(from_subscription)
    } else {
        from_subscription
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unlimited,
    Available { limit: i32 },
    Exhausted { limit: i32 },
}

/// Cabe mais uma embarcação?
pub fn capacity_for_new_vessel(limit: Option<i32>, current_count: i64) -> Capacity {
    match limit {
        None => Capacity::Unlimited,
        Some(limit) if current_count >= i64::from(limit) => Capacity::Exhausted { limit },
        Some(limit) => Capacity::Available { limit },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn org() -> Organization {
        let now = Utc::now();
        Organization {
            id: Uuid::new_v4(),
            name: "Blue Water".into(),
            is_active: true,
            billing_override_enabled: false,
            billing_override_vessel_limit: None,
            billing_override_expires_at: None,
            billing_override_reason: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            subscription_status: None,
            subscription_plan: None,
            addon_pack_quantity: 0,
            vessel_limit: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn parses_base_and_pack_items() {
        let items = vec![("price_base", Some(1)), ("price_pack", Some(2)), ("price_other", Some(9))];
        let parsed = parse_line_items(items, Some("price_base"), Some("price_pack"));
        assert_eq!(parsed.plan.as_deref(), Some("base"));
        assert_eq!(parsed.addon_pack_quantity, 2);
    }

    #[test]
    fn missing_pack_quantity_counts_as_zero() {
        let parsed = parse_line_items(vec![("price_pack", None)], Some("price_base"), Some("price_pack"));
        assert_eq!(parsed, ParsedPlan { plan: None, addon_pack_quantity: 0 });
    }

    #[test]
    fn unconfigured_prices_match_nothing() {
        let parsed = parse_line_items(vec![("price_base", Some(1))], None, None);
        assert_eq!(parsed.plan, None);
    }

    #[test]
    fn subscription_limit_is_base_plus_packs() {
        let pricing = PlanPricing::default();
        assert_eq!(subscription_vessel_limit(Some("base"), 2, pricing), Some(13));
        assert_eq!(subscription_vessel_limit(Some("base"), 0, pricing), Some(3));
        assert_eq!(subscription_vessel_limit(None, 2, pricing), None);
        assert_eq!(subscription_vessel_limit(Some(""), 2, pricing), None);
    }

    #[test]
    fn override_expiry_is_checked_against_now() {
        let now = Utc::now();
        assert!(override_active(true, None, now));
        assert!(override_active(true, Some(now + Duration::hours(1)), now));
        assert!(!override_active(true, Some(now - Duration::seconds(1)), now));
        assert!(!override_active(false, None, now));
    }

    #[test]
    fn active_override_limit_wins() {
        let mut org = org();
        org.subscription_plan = Some("base".into());
        org.billing_override_enabled = true;
        org.billing_override_vessel_limit = Some(50);
        assert_eq!(effective_vessel_limit(&org, PlanPricing::default(), Utc::now()), Some(50));
    }

    #[test]
    fn override_without_limit_falls_back_to_subscription() {
        let mut org = org();
        org.subscription_plan = Some("base".into());
        org.addon_pack_quantity = 1;
        org.billing_override_enabled = true;
        assert_eq!(effective_vessel_limit(&org, PlanPricing::default(), Utc::now()), Some(8));
    }

    #[test]
    fn expired_override_is_ignored() {
        let now = Utc::now();
        let mut org = org();
        org.billing_override_enabled = true;
        org.billing_override_vessel_limit = Some(50);
        org.billing_override_expires_at = Some(now - Duration::days(1));
        assert_eq!(effective_vessel_limit(&org, PlanPricing::default(), now), None);
    }

    #[test]
    fn capacity_decisions() {
        assert_eq!(capacity_for_new_vessel(None, 100), Capacity::Unlimited);
        assert_eq!(capacity_for_new_vessel(Some(3), 2), Capacity::Available { limit: 3 });
        assert_eq!(capacity_for_new_vessel(Some(3), 3), Capacity::Exhausted { limit: 3 });
    }
}
