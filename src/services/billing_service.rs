// src/services/billing_service.rs

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    config::StripeSettings,
    db::{org_repo::SubscriptionSync, OrgRepository, VesselRepository},
    integrations::stripe::{
        verify_webhook_signature, BillingProvider, CheckoutRequest, CheckoutSession, Event, Subscription,
    },
    middleware::tenancy::OrgContext,
    models::{
        billing::{BillingStatus, PackUpdateResult, RedirectUrl, WebhookAck},
        organization::Organization,
    },
    rules::entitlement::{
        effective_vessel_limit, override_active, parse_line_items, subscription_vessel_limit, PlanPricing,
    },
};

#[derive(Clone)]
pub struct BillingService {
    pool: PgPool,
    org_repo: OrgRepository,
    vessel_repo: VesselRepository,
    provider: Option<Arc<dyn BillingProvider>>,
    stripe: StripeSettings,
    pricing: PlanPricing,
    web_base_url: String,
}

impl BillingService {
    pub fn new(
        pool: PgPool,
        org_repo: OrgRepository,
        vessel_repo: VesselRepository,
        provider: Option<Arc<dyn BillingProvider>>,
        stripe: StripeSettings,
        pricing: PlanPricing,
        web_base_url: String,
    ) -> Self {
        Self { pool, org_repo, vessel_repo, provider, stripe, pricing, web_base_url }
    }

    fn provider(&self) -> Result<&Arc<dyn BillingProvider>, AppError> {
        self.provider
            .as_ref()
            .ok_or(AppError::BillingNotConfigured("STRIPE_SECRET_KEY"))
    }

    fn billing_url(&self) -> String {
        format!("{}/settings/billing", self.web_base_url)
    }

    async fn current_org(&self, ctx: &OrgContext) -> Result<Organization, AppError> {
        self.org_repo
            .find_org(&self.pool, ctx.org_id)
            .await?
            .ok_or(AppError::NotFound("organization"))
    }

    pub async fn checkout(&self, ctx: &OrgContext, pack_quantity: i32) -> Result<RedirectUrl, AppError> {
        let provider = self.provider()?;
        let org = self.current_org(ctx).await?;

        let base_price = self
            .stripe
            .price_base
            .as_deref()
            .ok_or(AppError::BillingNotConfigured("STRIPE_PRICE_BASE"))?;
        let pack_quantity = pack_quantity.max(0);

        let mut line_items = vec![(base_price, 1)];
        if let (true, Some(pack_price)) = (pack_quantity > 0, self.stripe.price_vessel_pack.as_deref()) {
            line_items.push((pack_price, pack_quantity));
        }

        // Cliente no provedor criado no primeiro checkout
        let customer_id = match org.stripe_customer_id.clone() {
            Some(id) => id,
            None => {
                let id = provider.create_customer(&org.name, org.id).await?;
                self.org_repo.set_stripe_customer(org.id, &id).await?;
                tracing::info!("💳 Cliente {} criado para a organização {}", id, org.id);
                id
            }
        };

        let billing_url = self.billing_url();
        let success_url = format!("{}?success=1", billing_url);
        let cancel_url = format!("{}?canceled=1", billing_url);

        let url = provider
            .create_checkout_session(&CheckoutRequest {
                customer_id: &customer_id,
                org_id: org.id,
                line_items,
                success_url: &success_url,
                cancel_url: &cancel_url,
            })
            .await?;

        Ok(RedirectUrl { url })
    }

    /// Ajusta a quantidade de pacotes direto no provedor; o banco é atualizado pelo webhook.
    pub async fn update_vessel_packs(&self, ctx: &OrgContext, pack_quantity: i32) -> Result<PackUpdateResult, AppError> {
        let provider = self.provider()?;
        let org = self.current_org(ctx).await?;

        let subscription_id = org
            .stripe_subscription_id
            .as_deref()
            .ok_or(AppError::NoActiveSubscription)?;
        let pack_price = self
            .stripe
            .price_vessel_pack
            .as_deref()
            .ok_or(AppError::BillingNotConfigured("STRIPE_PRICE_VESSEL_PACK"))?;
        let pack_quantity = pack_quantity.max(0);

        let subscription = provider.retrieve_subscription(subscription_id).await?;
        let pack_item = subscription.item_with_price(pack_price);

        match (pack_quantity, pack_item) {
            (0, Some(item)) => provider.delete_subscription_item(&item.id).await?,
            (0, None) => {}
            (quantity, Some(item)) => provider.update_subscription_item(&item.id, quantity).await?,
            (quantity, None) => {
                provider
                    .create_subscription_item(subscription_id, pack_price, quantity)
                    .await?
            }
        }

        Ok(PackUpdateResult {
            status: "success".to_string(),
            pack_quantity,
        })
    }

    pub async fn portal(&self, ctx: &OrgContext) -> Result<RedirectUrl, AppError> {
        let provider = self.provider()?;
        let org = self.current_org(ctx).await?;
        let customer_id = org.stripe_customer_id.as_deref().ok_or(AppError::NoBillingCustomer)?;

        let url = provider
            .create_portal_session(customer_id, &self.billing_url())
            .await?;
        Ok(RedirectUrl { url })
    }

    pub async fn status(&self, ctx: &OrgContext) -> Result<BillingStatus, AppError> {
        let org = self.current_org(ctx).await?;
        let vessel_count = self.vessel_repo.count_for_org(&self.pool, ctx.org_id).await?;
        let now = Utc::now();

        Ok(BillingStatus {
            effective_vessel_limit: effective_vessel_limit(&org, self.pricing, now),
            override_active: override_active(org.billing_override_enabled, org.billing_override_expires_at, now),
            plan: org.subscription_plan,
            status: org.subscription_status,
            current_period_end: org.current_period_end,
            addon_pack_quantity: org.addon_pack_quantity,
            base_vessels_included: self.pricing.base_vessels_included,
            vessels_per_pack: self.pricing.vessels_per_pack,
            vessel_limit: org.vessel_limit,
            vessel_count,
            override_vessel_limit: org.billing_override_vessel_limit,
            override_expires_at: org.billing_override_expires_at,
            override_reason: org.billing_override_reason,
        })
    }

    // =========================================================================
    //  WEBHOOK
    // =========================================================================

    /// Assinatura e formato inválidos viram erro (4xx). Falhas ao processar um
    /// evento válido voltam como `WebhookAck::error`.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookAck, AppError> {
        let secret = self
            .stripe
            .webhook_secret
            .as_deref()
            .ok_or(AppError::BillingNotConfigured("STRIPE_WEBHOOK_SECRET"))?;
        let signature = signature.ok_or(AppError::InvalidWebhookSignature)?;

        verify_webhook_signature(payload, signature, secret, Utc::now().timestamp()).map_err(|e| {
            tracing::warn!("Webhook rejeitado: {}", e);
            AppError::InvalidWebhookSignature
        })?;

        let event: Event =
            serde_json::from_slice(payload).map_err(|e| AppError::InvalidWebhookPayload(e.to_string()))?;
        tracing::info!("Webhook recebido: {} ({})", event.event_type, event.id);

        match self.process_event(&event).await {
            Ok(()) => Ok(WebhookAck::success()),
            Err(e) => {
                tracing::error!("🔥 Erro processando webhook {}: {}", event.event_type, e);
                Ok(WebhookAck::error(e.to_string()))
            }
        }
    }

    async fn process_event(&self, event: &Event) -> Result<(), AppError> {
        match event.event_type.as_str() {
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription: Subscription = parse_object(event)?;
                self.sync_subscription(&subscription).await
            }
            "customer.subscription.deleted" => {
                let subscription: Subscription = parse_object(event)?;
                match self.locate_org(&subscription).await? {
                    Some(org) => {
                        self.org_repo.clear_subscription(org.id).await?;
                        tracing::info!("Assinatura {} cancelada (org {})", subscription.id, org.id);
                    }
                    None => tracing::warn!("Assinatura {} sem organização correspondente", subscription.id),
                }
                Ok(())
            }
            "checkout.session.completed" => {
                let session: CheckoutSession = parse_object(event)?;
                match (session.mode.as_deref(), session.subscription.as_deref()) {
                    (Some("subscription"), Some(subscription_id)) => {
                        let subscription = self.provider()?.retrieve_subscription(subscription_id).await?;
                        self.sync_subscription(&subscription).await
                    }
                    _ => Ok(()),
                }
            }
            other => {
                tracing::info!("Evento ignorado: {}", other);
                Ok(())
            }
        }
    }

    /// Organização da assinatura: metadata `org_id`, senão o cliente.
    async fn locate_org(&self, subscription: &Subscription) -> Result<Option<Organization>, AppError> {
        if let Some(org_id) = subscription.org_id() {
            if let Some(org) = self.org_repo.find_org(&self.pool, org_id).await? {
                return Ok(Some(org));
            }
        }
        self.org_repo.find_by_stripe_customer(&subscription.customer).await
    }

    async fn sync_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let Some(org) = self.locate_org(subscription).await? else {
            tracing::warn!("Assinatura {} sem organização correspondente", subscription.id);
            return Ok(());
        };

        let parsed = parse_line_items(
            subscription.line_items(),
            self.stripe.price_base.as_deref(),
            self.stripe.price_vessel_pack.as_deref(),
        );
        let vessel_limit =
            subscription_vessel_limit(parsed.plan.as_deref(), parsed.addon_pack_quantity, self.pricing);

        let org = self
            .org_repo
            .apply_subscription(
                org.id,
                &SubscriptionSync {
                    customer_id: Some(&subscription.customer),
                    subscription_id: Some(&subscription.id),
                    status: Some(&subscription.status),
                    plan: parsed.plan.as_deref(),
                    addon_pack_quantity: parsed.addon_pack_quantity,
                    vessel_limit,
                    current_period_end: subscription.period_end(),
                },
            )
            .await?;

        tracing::info!(
            "Assinatura {} sincronizada: org {} status={:?} limite={:?}",
            subscription.id,
            org.id,
            org.subscription_status,
            org.vessel_limit
        );
        Ok(())
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &Event) -> Result<T, AppError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::InvalidWebhookPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{integrations::stripe::sign_for_tests, models::auth::User, models::organization::OrgRole};
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    const SECRET: &str = "whsec_test";

    fn service(webhook_secret: Option<&str>) -> BillingService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/dockops_test")
            .expect("lazy pool");
        BillingService::new(
            pool.clone(),
            OrgRepository::new(pool.clone()),
            VesselRepository::new(pool),
            None,
            StripeSettings {
                webhook_secret: webhook_secret.map(str::to_string),
                price_base: Some("price_base".to_string()),
                price_vessel_pack: Some("price_pack".to_string()),
                ..Default::default()
            },
            PlanPricing { base_vessels_included: 3, vessels_per_pack: 5 },
            "https://app.example.com".to_string(),
        )
    }

    fn ctx() -> OrgContext {
        let now = Utc::now();
        OrgContext {
            user: User {
                id: Uuid::new_v4(),
                auth_provider: "default".to_string(),
                auth_subject: "user_1".to_string(),
                email: "captain@example.com".to_string(),
                name: None,
                is_super_admin: false,
                created_at: now,
                updated_at: now,
            },
            org_id: Uuid::new_v4(),
            role: OrgRole::Admin,
        }
    }

    fn signed(body: &[u8]) -> String {
        sign_for_tests(body, SECRET, Utc::now().timestamp())
    }

    #[tokio::test]
    async fn webhook_without_secret_is_a_configuration_error() {
        let result = service(None).handle_webhook(b"{}", Some("t=1,v1=00")).await;
        assert!(matches!(result, Err(AppError::BillingNotConfigured("STRIPE_WEBHOOK_SECRET"))));
    }

    #[tokio::test]
    async fn webhook_rejects_missing_and_forged_signatures() {
        let svc = service(Some(SECRET));
        let body = br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;

        let missing = svc.handle_webhook(body, None).await;
        assert!(matches!(missing, Err(AppError::InvalidWebhookSignature)));

        let forged = sign_for_tests(body, "whsec_other", Utc::now().timestamp());
        let result = svc.handle_webhook(body, Some(&forged)).await;
        assert!(matches!(result, Err(AppError::InvalidWebhookSignature)));
    }

    #[tokio::test]
    async fn webhook_rejects_signed_garbage() {
        let body = b"not json";
        let result = service(Some(SECRET)).handle_webhook(body, Some(&signed(body))).await;
        assert!(matches!(result, Err(AppError::InvalidWebhookPayload(_))));
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let body = br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let ack = service(Some(SECRET))
            .handle_webhook(body, Some(&signed(body)))
            .await
            .expect("ack");
        assert_eq!(ack.status, "success");
        assert!(ack.message.is_none());
    }

    #[tokio::test]
    async fn processing_failures_are_acknowledged_as_errors() {
        // Objeto sem os campos de uma assinatura
        let body = br#"{"id":"evt_2","type":"customer.subscription.updated","data":{"object":{"id":"sub_1"}}}"#;
        let ack = service(Some(SECRET))
            .handle_webhook(body, Some(&signed(body)))
            .await
            .expect("ack");
        assert_eq!(ack.status, "error");
        assert!(ack.message.is_some());
    }

    #[tokio::test]
    async fn checkout_session_without_subscription_is_a_no_op() {
        let body = br#"{"id":"evt_3","type":"checkout.session.completed","data":{"object":{"id":"cs_1","mode":"payment"}}}"#;
        let ack = service(Some(SECRET))
            .handle_webhook(body, Some(&signed(body)))
            .await
            .expect("ack");
        assert_eq!(ack.status, "success");
    }

    #[tokio::test]
    async fn billing_actions_need_a_provider() {
        let svc = service(Some(SECRET));
        let ctx = ctx();

        assert!(matches!(
            svc.checkout(&ctx, 1).await,
            Err(AppError::BillingNotConfigured("STRIPE_SECRET_KEY"))
        ));
        assert!(matches!(
            svc.update_vessel_packs(&ctx, 2).await,
            Err(AppError::BillingNotConfigured("STRIPE_SECRET_KEY"))
        ));
        assert!(matches!(
            svc.portal(&ctx).await,
            Err(AppError::BillingNotConfigured("STRIPE_SECRET_KEY"))
        ));
    }
}
