//! Dashboard — Axum web server exposing the engine's state.
//!
//! Read-only JSON API over the weight registry: current weights, the
//! latest recalibration snapshot, per-algorithm trust, and the audit log.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::AppState;

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tokio::spawn(async move {
        info!(port, "Dashboard server starting on http://localhost:{port}");
        let listener = match tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind dashboard port {port}"))
        {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "Dashboard disabled");
                return;
            }
        };
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server exited");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/recalibration", get(routes::get_recalibration))
        .route("/api/weights", get(routes::get_weights))
        .route("/api/trust/:algorithm_id", get(routes::get_trust))
        .route("/api/actions", get(routes::get_actions))
        .route("/health", get(routes::get_health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
