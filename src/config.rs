// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        InventoryRepository, MaintenanceRepository, OrgRepository, TripRepository, UserRepository,
        VesselRepository,
    },
    integrations::{
        mailer::{LogMailer, Mailer, ResendMailer},
        stripe::{BillingProvider, StripeClient},
    },
    rules::entitlement::PlanPricing,
    services::{
        admin_service::AdminService, auth::AuthService, billing_service::BillingService,
        inventory_service::InventoryService, maintenance_service::MaintenanceService,
        org_service::OrgService, trip_service::TripService, vessel_service::VesselService,
    },
};

/// O que fazer quando uma organização já está no limite de embarcações.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselLimitPolicy {
    /// Só registra um aviso no log.
    Report,
    /// Recusa a criação (409).
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub price_base: Option<String>,
    pub price_vessel_pack: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub auth_provider: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub web_base_url: String,
    pub stripe: StripeSettings,
    pub pricing: PlanPricing,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub vessel_limit_policy: VesselLimitPolicy,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Monta as configurações a partir de qualquer fonte chave → valor.
    pub fn from_source<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Variáveis vazias contam como ausentes.
        let opt = |key: &str| get(key).filter(|value| !value.trim().is_empty());

        let database_url = opt("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = opt("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match opt("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => 5,
        };

        let defaults = PlanPricing::default();
        let pricing = PlanPricing {
            base_vessels_included: match opt("BASE_VESSELS_INCLUDED") {
                Some(raw) => raw.parse().context("BASE_VESSELS_INCLUDED inválido")?,
                None => defaults.base_vessels_included,
            },
            vessels_per_pack: match opt("VESSELS_PER_PACK") {
                Some(raw) => raw.parse().context("VESSELS_PER_PACK inválido")?,
                None => defaults.vessels_per_pack,
            },
        };

        let vessel_limit_policy = match opt("VESSEL_LIMIT_POLICY").as_deref() {
            None | Some("report") => VesselLimitPolicy::Report,
            Some("reject") => VesselLimitPolicy::Reject,
            Some(other) => anyhow::bail!("VESSEL_LIMIT_POLICY inválida: {}", other),
        };

        let web_base_url = opt("WEB_BASE_URL")
            .or_else(|| opt("FRONTEND_URL"))
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            auth_provider: opt("AUTH_PROVIDER").unwrap_or_else(|| "default".to_string()),
            bind_addr: opt("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
            web_base_url: web_base_url.trim_end_matches('/').to_string(),
            stripe: StripeSettings {
                secret_key: opt("STRIPE_SECRET_KEY"),
                webhook_secret: opt("STRIPE_WEBHOOK_SECRET"),
                price_base: opt("STRIPE_PRICE_BASE"),
                price_vessel_pack: opt("STRIPE_PRICE_VESSEL_PACK"),
            },
            pricing,
            resend_api_key: opt("RESEND_API_KEY"),
            from_email: opt("FROM_EMAIL").unwrap_or_else(|| "noreply@dock-ops.com".to_string()),
            vessel_limit_policy,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub org_service: OrgService,
    pub admin_service: AdminService,
    pub vessel_service: VesselService,
    pub inventory_service: InventoryService,
    pub maintenance_service: MaintenanceService,
    pub trip_service: TripService,
    pub billing_service: BillingService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let mailer: Arc<dyn Mailer> = match &settings.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(key.clone(), settings.from_email.clone())),
            None => {
                tracing::warn!("RESEND_API_KEY ausente: convites serão apenas registrados no log");
                Arc::new(LogMailer)
            }
        };

        let billing: Option<Arc<dyn BillingProvider>> = match &settings.stripe.secret_key {
            Some(key) => Some(Arc::new(StripeClient::new(key.clone()))),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY ausente: rotas de cobrança indisponíveis");
                None
            }
        };

        Ok(Self::with_collaborators(settings, db_pool, mailer, billing))
    }

    /// Monta o gráfico de dependências. Também usado pelos testes (pool lazy + colaboradores falsos).
    pub fn with_collaborators(
        settings: Settings,
        db_pool: PgPool,
        mailer: Arc<dyn Mailer>,
        billing: Option<Arc<dyn BillingProvider>>,
    ) -> Self {
        let settings = Arc::new(settings);

        let user_repo = UserRepository::new(db_pool.clone());
        let org_repo = OrgRepository::new(db_pool.clone());
        let vessel_repo = VesselRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let maintenance_repo = MaintenanceRepository::new(db_pool.clone());
        let trip_repo = TripRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            settings.jwt_secret.clone(),
            settings.auth_provider.clone(),
        );
        let org_service = OrgService::new(
            db_pool.clone(),
            org_repo.clone(),
            mailer,
            settings.web_base_url.clone(),
        );
        let admin_service = AdminService::new(db_pool.clone(), org_repo.clone(), user_repo);
        let vessel_service = VesselService::new(
            db_pool.clone(),
            vessel_repo.clone(),
            org_repo.clone(),
            settings.pricing,
            settings.vessel_limit_policy,
        );
        let inventory_service =
            InventoryService::new(db_pool.clone(), inventory_repo.clone(), vessel_repo.clone());
        let maintenance_service = MaintenanceService::new(
            db_pool.clone(),
            maintenance_repo,
            vessel_repo.clone(),
            trip_repo.clone(),
        );
        let trip_service = TripService::new(db_pool.clone(), trip_repo, vessel_repo.clone(), inventory_repo);
        let billing_service = BillingService::new(
            db_pool.clone(),
            org_repo,
            vessel_repo,
            billing,
            settings.stripe.clone(),
            settings.pricing,
            settings.web_base_url.clone(),
        );

        Self {
            db_pool,
            settings,
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            org_service,
            admin_service,
            vessel_service,
            inventory_service,
            maintenance_service,
            trip_service,
            billing_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let settings = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/dockops"),
            ("JWT_SECRET", "secret"),
        ]))
        .expect("settings");

        assert_eq!(settings.auth_provider, "default");
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.web_base_url, "http://localhost:3000");
        assert_eq!(settings.pricing, PlanPricing::default());
        assert_eq!(settings.from_email, "noreply@dock-ops.com");
        assert_eq!(settings.vessel_limit_policy, VesselLimitPolicy::Report);
        assert!(settings.stripe.secret_key.is_none());
        assert!(settings.resend_api_key.is_none());
    }

    #[test]
    fn missing_required_vars_fail() {
        assert!(Settings::from_source(source(&[("JWT_SECRET", "s")])).is_err());
        assert!(Settings::from_source(source(&[("DATABASE_URL", "postgres://x")])).is_err());
    }

    #[test]
    fn frontend_url_is_the_fallback_for_web_base_url() {
        let settings = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("FRONTEND_URL", "https://app.dock-ops.com/"),
            ("VESSEL_LIMIT_POLICY", "reject"),
            ("VESSELS_PER_PACK", "10"),
            ("STRIPE_SECRET_KEY", ""),
        ]))
        .expect("settings");

        assert_eq!(settings.web_base_url, "https://app.dock-ops.com");
        assert_eq!(settings.vessel_limit_policy, VesselLimitPolicy::Reject);
        assert_eq!(settings.pricing.vessels_per_pack, 10);
        assert!(settings.stripe.secret_key.is_none());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("VESSEL_LIMIT_POLICY", "maybe"),
        ]));
        assert!(result.is_err());
    }
}
