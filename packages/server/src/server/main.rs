// Main entry point for the moderation API server

use std::sync::Arc;

use anyhow::{Context, Result};
use moderation_core::domains::auth::JwtService;
use moderation_core::kernel::{BaseNotifier, LoggingNotifier, MailRelayClient, ServerDeps, StorePools};
use moderation_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn connect(name: &str, url: &str) -> Result<PgPool> {
    tracing::info!(store = name, "Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .with_context(|| format!("Failed to connect to {} database", name))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .with_context(|| format!("Failed to run migrations on {} database", name))?;
    tracing::info!(store = name, "Database connected and migrated");

    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,moderation_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting moderation API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let pools = StorePools {
        events: connect("events", &config.events_database_url).await?,
        users: connect("users", &config.users_database_url).await?,
        postings: connect("postings", &config.postings_database_url).await?,
    };

    let notifier: Arc<dyn BaseNotifier> = match config.mail_relay_url.clone() {
        Some(url) => Arc::new(MailRelayClient::new(url, config.mail_from.clone())),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; notifications will only be logged");
            Arc::new(LoggingNotifier)
        }
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let deps = ServerDeps::postgres(pools, notifier, jwt_service, config.admin_identifiers.clone());

    let app = build_app(deps, config.moderation);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
