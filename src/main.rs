use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cenoteando::config::config;
use cenoteando::database::DatabaseManager;
use cenoteando::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config().clone();
    info!("Starting Cenoteando API in {:?} mode", config.environment);

    if cenoteando::is_production!() && config.security.jwt_secret.is_empty() {
        bail!("SECURITY_JWT_SECRET must be set in production");
    }

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open document store")?;
    info!("Using {} document store", store.backend());

    let state = AppState::new(config.clone(), store);

    if let (Some(email), Some(password)) = (&config.security.admin_email, &config.security.admin_password) {
        if state.services.users.bootstrap_admin(email, password).await? {
            info!("Created administrator {}", email);
        }
    } else if config.security.admin_email.is_some() {
        warn!("CENOTEANDO_ADMIN_EMAIL set without CENOTEANDO_ADMIN_PASSWORD; no administrator created");
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Cenoteando API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
