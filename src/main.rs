//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod integrations;
mod middleware;
mod models;
mod routes;
mod rules;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível (padrão: info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let bind_addr = app_state.settings.bind_addr.clone();
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Swagger UI em /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
