use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Timeouts bounding the phases after the ledger decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationSettings {
    /// Budget for one domain-phase hook.
    pub domain_call_timeout: Duration,
    /// Budget for each notification send.
    pub notification_timeout: Duration,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            domain_call_timeout: Duration::from_millis(5000),
            notification_timeout: Duration::from_millis(3000),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub events_database_url: String,
    pub users_database_url: String,
    pub postings_database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub admin_identifiers: Vec<String>,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub moderation: ModerationSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let defaults = ModerationSettings::default();

        Ok(Self {
            events_database_url: env::var("EVENTS_DATABASE_URL")
                .unwrap_or_else(|_| database_url.clone()),
            users_database_url: env::var("USERS_DATABASE_URL")
                .unwrap_or_else(|_| database_url.clone()),
            postings_database_url: env::var("POSTINGS_DATABASE_URL")
                .unwrap_or_else(|_| database_url.clone()),
            database_url,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "moderation-server".to_string()),
            admin_identifiers: parse_list(&env::var("ADMIN_IDENTIFIERS").unwrap_or_default()),
            mail_relay_url: env::var("MAIL_RELAY_URL").ok().filter(|url| !url.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string()),
            moderation: ModerationSettings {
                domain_call_timeout: millis_var(
                    "DOMAIN_CALL_TIMEOUT_MS",
                    defaults.domain_call_timeout,
                )?,
                notification_timeout: millis_var(
                    "NOTIFICATION_TIMEOUT_MS",
                    defaults.notification_timeout,
                )?,
            },
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn millis_var(name: &str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .with_context(|| format!("{} must be a number of milliseconds", name)),
        Err(_) => Ok(default),
    }
}
