//! Axum router configuration with middleware.
//!
//! - `POST /ussd`: gateway endpoint
//! - `POST /admin/catalog/reload`: reload menu files
//! - `GET /health`
//!
//! Middleware: CORS, tracing.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ussd", post(handlers::ussd::handle_ussd))
        .route("/admin/catalog/reload", post(handlers::admin::reload_catalog))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness check including a database round trip.
async fn health_check(State(state): State<AppState>) -> (StatusCode, axum::Json<serde_json::Value>) {
    let database_ok = match state.db_pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            false
        }
    };
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        axum::Json(serde_json::json!({
            "status": if database_ok { "ok" } else { "degraded" },
            "database": database_ok,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
