//! Operator CLI for the moderation ledger
//!
//! Audits decided events against their domain mirrors, repairs divergences
//! and issues session tokens. Output is JSON on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moderation_core::common::{EventId, UserId};
use moderation_core::config::Config;
use moderation_core::domains::auth::JwtService;
use moderation_core::domains::events::EventType;
use moderation_core::domains::moderation::ModerationService;
use moderation_core::kernel::{BaseNotifier, LoggingNotifier, MailRelayClient, ServerDeps, StorePools};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "moderation_cli")]
#[command(about = "Moderation ledger operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List decided events whose domain mirror disagrees with the ledger
    Audit {
        /// Restrict to one event type (registration, posting, cite, private_request)
        #[arg(long = "type")]
        event_type: Option<EventType>,
    },

    /// Compare one event with its domain mirror
    Check { id: EventId },

    /// Re-run the domain hook for a diverged event
    Reconcile { id: EventId },

    /// Print one ledger entry
    Show { id: EventId },

    /// Issue a session token
    Token {
        user_id: UserId,
        #[arg(long, default_value = "operator")]
        username: String,
        #[arg(long)]
        admin: bool,
    },
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,moderation_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Token {
            user_id,
            username,
            admin,
        } => {
            let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());
            let token = jwt.create_token(user_id, &username, admin)?;
            output(&json!({ "token": token }))
        }
        Commands::Audit { event_type } => {
            let service = service(&config).await?;
            output(&service.audit(event_type).await?)
        }
        Commands::Check { id } => {
            let service = service(&config).await?;
            output(&service.check_consistency(id).await?)
        }
        Commands::Reconcile { id } => {
            let service = service(&config).await?;
            output(&service.reconcile(id).await?)
        }
        Commands::Show { id } => {
            let service = service(&config).await?;
            match service.get_event(id).await? {
                Some(event) => output(&event),
                None => output(&json!({ "error": format!("Event {} not found", id) })),
            }
        }
    }
}

async fn connect(name: &str, url: &str) -> Result<PgPool> {
    PgPool::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {} database", name))
}

async fn service(config: &Config) -> Result<ModerationService> {
    let pools = StorePools {
        events: connect("events", &config.events_database_url).await?,
        users: connect("users", &config.users_database_url).await?,
        postings: connect("postings", &config.postings_database_url).await?,
    };

    let notifier: Arc<dyn BaseNotifier> = match config.mail_relay_url.clone() {
        Some(url) => Arc::new(MailRelayClient::new(url, config.mail_from.clone())),
        None => Arc::new(LoggingNotifier),
    };
    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let deps = ServerDeps::postgres(pools, notifier, jwt_service, config.admin_identifiers.clone());

    Ok(ModerationService::new(deps, config.moderation))
}
