// src/routes.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, tenancy::tenant_guard},
};

fn cors_layer(web_base_url: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(web_base_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => layer.allow_origin(Any),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Sem autenticação
    let public_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/webhooks/stripe", post(handlers::billing::stripe_webhook));

    // Só o token: usuário, criação/entrada em organizações e administração da plataforma
    let user_routes = Router::new()
        .route("/me", get(handlers::me::get_me))
        .route(
            "/orgs",
            post(handlers::orgs::create_org).get(handlers::orgs::list_my_orgs),
        )
        .route("/orgs/requests", post(handlers::orgs::request_org))
        .route("/orgs/invites/accept", post(handlers::orgs::accept_invite))
        .route("/admin/orgs", get(handlers::admin::list_orgs))
        .route("/admin/orgs/{org_id}/toggle-status", post(handlers::admin::toggle_org_status))
        .route("/admin/orgs/{org_id}/billing-override", put(handlers::admin::set_billing_override))
        .route("/admin/orgs/requests", get(handlers::admin::list_requests))
        .route(
            "/admin/orgs/requests/{request_id}/review",
            post(handlers::admin::review_request),
        )
        .route("/admin/users", get(handlers::admin::list_users))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Token + x-org-id
    let org_routes = Router::new()
        // Membros e convites
        .route("/orgs/{org_id}/members", get(handlers::orgs::list_members))
        .route("/orgs/{org_id}/members/{user_id}/role", post(handlers::orgs::change_role))
        .route("/orgs/{org_id}/members/{user_id}/disable", post(handlers::orgs::disable_member))
        .route(
            "/orgs/{org_id}/invites",
            post(handlers::orgs::create_invite).get(handlers::orgs::list_invites),
        )
        .route("/orgs/{org_id}/invites/{invite_id}/revoke", post(handlers::orgs::revoke_invite))
        // Embarcações
        .route(
            "/vessels",
            get(handlers::vessels::list_vessels).post(handlers::vessels::create_vessel),
        )
        .route(
            "/vessels/{vessel_id}",
            get(handlers::vessels::get_vessel)
                .patch(handlers::vessels::update_vessel)
                .delete(handlers::vessels::delete_vessel),
        )
        .route(
            "/vessels/{vessel_id}/comments",
            get(handlers::vessels::list_comments).post(handlers::vessels::add_comment),
        )
        // Estoque
        .route(
            "/vessels/{vessel_id}/inventory/groups",
            get(handlers::inventory::list_groups).post(handlers::inventory::create_group),
        )
        .route(
            "/vessels/{vessel_id}/inventory/groups/reorder",
            put(handlers::inventory::reorder_groups),
        )
        .route(
            "/inventory/groups/{group_id}",
            patch(handlers::inventory::update_group).delete(handlers::inventory::delete_group),
        )
        .route(
            "/vessels/{vessel_id}/inventory/requirements",
            get(handlers::inventory::list_requirements).post(handlers::inventory::create_requirement),
        )
        .route(
            "/vessels/{vessel_id}/inventory/items/reorder",
            put(handlers::inventory::reorder_requirements),
        )
        .route(
            "/inventory/requirements/{requirement_id}",
            patch(handlers::inventory::update_requirement).delete(handlers::inventory::delete_requirement),
        )
        .route(
            "/inventory/requirements/{requirement_id}/history",
            get(handlers::inventory::requirement_history),
        )
        .route(
            "/inventory/requirements/{requirement_id}/adjustments",
            get(handlers::inventory::list_adjustments).post(handlers::inventory::adjust_stock),
        )
        // Conferências
        .route(
            "/vessels/{vessel_id}/inventory/checks",
            get(handlers::checks::list_checks).post(handlers::checks::start_check),
        )
        .route("/inventory/checks/{check_id}", get(handlers::checks::get_check))
        .route("/inventory/checks/{check_id}/lines", put(handlers::checks::upsert_lines))
        .route(
            "/inventory/checks/{check_id}/lines/{line_id}",
            patch(handlers::checks::update_line),
        )
        .route("/inventory/checks/{check_id}/submit", post(handlers::checks::submit_check))
        // Manutenção
        .route(
            "/vessels/{vessel_id}/maintenance/tasks",
            get(handlers::maintenance::list_tasks).post(handlers::maintenance::create_task),
        )
        .route(
            "/vessels/{vessel_id}/maintenance/tasks/reorder",
            put(handlers::maintenance::reorder_tasks),
        )
        .route(
            "/maintenance/tasks/{task_id}",
            get(handlers::maintenance::get_task)
                .patch(handlers::maintenance::update_task)
                .delete(handlers::maintenance::delete_task),
        )
        .route(
            "/maintenance/tasks/{task_id}/logs",
            get(handlers::maintenance::list_logs).post(handlers::maintenance::create_log),
        )
        // Viagens
        .route(
            "/vessels/{vessel_id}/trips",
            get(handlers::trips::list_trips).post(handlers::trips::log_trip),
        )
        .route(
            "/vessels/{vessel_id}/trips/{trip_id}",
            patch(handlers::trips::update_trip).delete(handlers::trips::delete_trip),
        )
        .route("/vessels/{vessel_id}/total-hours", get(handlers::trips::total_hours))
        // Cobrança
        .route(
            "/billing/checkout-session",
            post(handlers::billing::create_checkout_session),
        )
        .route(
            "/billing/update-vessel-packs",
            post(handlers::billing::update_vessel_packs),
        )
        .route("/billing/portal", post(handlers::billing::create_portal_session))
        .route("/billing/status", get(handlers::billing::billing_status))
        // tenant_guard precisa do usuário: auth_guard roda antes (camada mais externa)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let api = public_routes.merge(user_routes).merge(org_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&app_state.settings.web_base_url))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Settings,
        db::{OrgRepository, UserRepository},
        integrations::{mailer::LogMailer, stripe::sign_for_tests},
        models::{
            auth::Claims,
            organization::{MembershipStatus, OrgRole},
        },
        services::test_support::seed_vessel,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::{postgres::PgPoolOptions, PgPool};
    use std::{collections::HashMap, sync::Arc};
    use tower::ServiceExt;

    const WEBHOOK_SECRET: &str = "whsec_test";

    const JWT_SECRET: &str = "test-secret";

    fn settings(with_webhook_secret: bool) -> Settings {
        let mut vars = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/dockops_test"),
            ("JWT_SECRET", JWT_SECRET),
        ]);
        if with_webhook_secret {
            vars.insert("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET);
        }
        Settings::from_source(|key| vars.get(key).map(|v| v.to_string())).expect("settings")
    }

    fn app(with_webhook_secret: bool) -> Router {
        let settings = settings(with_webhook_secret);
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .expect("lazy pool");

        build_router(AppState::with_collaborators(settings, pool, Arc::new(LogMailer), None))
    }

    fn token_for(subject: &str, email: &str) -> String {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            name: None,
            exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_ref())).expect("encode")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app(false)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app(false)
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/api/vessels"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let response = app(false)
            .oneshot(Request::get("/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn org_routes_check_the_token_before_the_org_header() {
        let response = app(false)
            .oneshot(
                Request::get("/api/vessels")
                    .header("accept-language", "pt-BR,pt;q=0.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Token de autenticação inválido ou ausente.");
    }

    #[tokio::test]
    async fn forged_tokens_are_rejected() {
        let response = app(false)
            .oneshot(
                Request::get("/api/vessels")
                    .header("authorization", "Bearer not-a-jwt")
                    .header("x-org-id", uuid::Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_without_secret_is_a_server_error() {
        let response = app(false)
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("stripe-signature", "t=1,v1=00")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let response = app(true)
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("stripe-signature", "t=1,v1=deadbeef")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signed_webhook_is_acknowledged() {
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let signature = sign_for_tests(payload.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp());

        let response = app(true)
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("stripe-signature", signature)
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn webhook_with_absurd_timestamp_is_rejected() {
        let response = app(true)
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("stripe-signature", "t=-9223372036854775808,v1=00")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn technicians_cannot_log_trips(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let tech = UserRepository::new(pool.clone())
            .upsert_from_identity("default", "user_tech", "tech@example.com", None)
            .await
            .expect("tech");
        OrgRepository::new(pool.clone())
            .create_membership(&pool, ctx.org_id, tech.id, OrgRole::Tech, MembershipStatus::Active)
            .await
            .expect("membership");

        let app = build_router(AppState::with_collaborators(settings(false), pool.clone(), Arc::new(LogMailer), None));
        let log_trip = |subject: &str, email: &str| {
            Request::post(format!("/api/vessels/{}/trips", vessel.id))
                .header("authorization", format!("Bearer {}", token_for(subject, email)))
                .header("x-org-id", ctx.org_id.to_string())
                .header("content-type", "application/json")
                .body(Body::from(r#"{"hours": 2}"#))
                .unwrap()
        };

        let response = app.clone().oneshot(log_trip("user_tech", "tech@example.com")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(log_trip("user_captain", "captain@example.com")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
