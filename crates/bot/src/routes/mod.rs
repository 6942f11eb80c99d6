//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Slack
//! POST /slack/commands         - Slash commands
//! POST /slack/interactions     - Deploy prompt button clicks
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod slack;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(slack::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
