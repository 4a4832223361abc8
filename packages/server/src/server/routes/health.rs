use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::server::app::AppState;

/// Longest a single store ping may take before it counts as down.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    events: StoreHealth,
    users: StoreHealth,
    postings: StoreHealth,
}

#[derive(Serialize)]
pub struct StoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StoreHealth {
    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

async fn check_store<F>(ping: F) -> StoreHealth
where
    F: Future<Output = anyhow::Result<()>>,
{
    match tokio::time::timeout(PING_TIMEOUT, ping).await {
        Ok(Ok(())) => StoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => StoreHealth {
            status: "error".to_string(),
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => StoreHealth {
            status: "error".to_string(),
            error: Some("Query timeout (>5s)".to_string()),
        },
    }
}

/// Health check endpoint
///
/// Pings the ledger and each domain store. Returns 200 OK if all of them
/// answer, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let deps = &state.deps;
    let (events, users, postings) = tokio::join!(
        check_store(deps.events.ping()),
        check_store(deps.users.ping()),
        check_store(deps.postings.ping()),
    );

    let is_healthy = events.is_ok() && users.is_ok() && postings.is_ok();

    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            events,
            users,
            postings,
        }),
    )
}
