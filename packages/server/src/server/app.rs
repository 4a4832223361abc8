//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ModerationSettings;
use crate::domains::moderation::ModerationService;
use crate::kernel::ServerDeps;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    pub moderation: ModerationService,
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps, settings: ModerationSettings) -> Router {
    let app_state = AppState {
        moderation: ModerationService::new(deps.clone(), settings),
        deps,
    };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let jwt_service = app_state.deps.jwt_service.clone();

    Router::new()
        // Ledger and decisions (administrators)
        .route(
            "/api/v1/events",
            get(list_events_handler).post(record_event_handler),
        )
        .route("/api/v1/events/:id", get(get_event_handler))
        .route("/api/v1/events/:id/approve", post(approve_event_handler))
        .route("/api/v1/events/:id/reject", post(reject_event_handler))
        .route("/api/v1/events/:id/consistency", get(consistency_handler))
        .route("/api/v1/events/:id/reconcile", post(reconcile_handler))
        .route("/api/v1/audit", get(audit_handler))
        .route("/api/v1/review/:event_type", get(review_queue_handler))
        // Submissions
        .route("/api/v1/registrations", post(register_handler))
        .route("/api/v1/postings", post(submit_posting_handler))
        .route("/api/v1/postings/:id/cite", post(cite_posting_handler))
        .route("/api/v1/postings/:id/terminate", post(terminate_posting_handler))
        .route("/api/v1/conversations", post(request_conversation_handler))
        .route(
            "/api/v1/conversations/:id/validate",
            post(validate_password_handler),
        )
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
