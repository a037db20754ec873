//! REST API for a finished scenario run.
//!
//! Provides two GET endpoints:
//! - `/summary`: frequency summary, allocation plan, and run report
//! - `/channels`: recorded channels with optional time-range filtering

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::runner::ScenarioOutcome;

pub use types::{ChannelsQuery, ErrorResponse, SummaryResponse};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the run completes and wrapped in `Arc`; no
/// locks are needed since all data is read-only.
pub struct AppState {
    /// Preset name or scenario path the run came from.
    pub scenario: String,
    pub outcome: ScenarioOutcome,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/channels", get(handlers::get_channels))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
