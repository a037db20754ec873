//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::sim::allocator::AllocationPlan;
use crate::sim::scheduler::RunReport;
use crate::sim::summary::RunSummary;

/// Combined run response: summary, transfer plans, and event report.
#[derive(Debug, Serialize)]
pub struct SummaryResponse<'a> {
    pub scenario: &'a str,
    pub summary: &'a RunSummary,
    /// Empty when the scenario has no transfer change.
    pub plans: &'a [AllocationPlan],
    pub report: &'a RunReport,
}

/// Optional range query parameters for the channels endpoint.
#[derive(Debug, Deserialize)]
pub struct ChannelsQuery {
    /// Start time in seconds (inclusive).
    pub from: Option<f64>,
    /// End time in seconds (inclusive).
    pub to: Option<f64>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
