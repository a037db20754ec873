//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::types::{ChannelsQuery, ErrorResponse, SummaryResponse};

/// Returns the frequency summary, allocation plans, and run report.
///
/// `GET /summary` → 200 + `SummaryResponse` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Response {
    let outcome = &state.outcome;
    Json(SummaryResponse {
        scenario: &state.scenario,
        summary: &outcome.summary,
        plans: &outcome.plans,
        report: &outcome.report,
    })
    .into_response()
}

/// Returns recorded channels, optionally filtered by time range.
///
/// `GET /channels` → 200 + `ChannelTable` JSON
/// `GET /channels?from=1.0&to=2.0` → samples with `1.0 <= t <= 2.0`
/// `GET /channels?from=5&to=1` → 400 + `ErrorResponse`
pub async fn get_channels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChannelsQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(f64::NEG_INFINITY);
    let to = query.to.unwrap_or(f64::INFINITY);

    if from.is_nan() || to.is_nan() || from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    Ok(Json(state.outcome.channels.window(from, to)))
}
