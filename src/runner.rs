//! End-to-end execution of a scenario on the reference engine.

use serde::Serialize;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::engine::ChannelTable;
use crate::engine::swing::SwingEngine;
use crate::error::SessionError;
use crate::sim::allocator::{AllocationPlan, CapacityAllocator};
use crate::sim::scheduler::RunReport;
use crate::sim::session::SimulationSession;
use crate::sim::summary::RunSummary;

/// Everything a scenario run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    /// Plans applied for the transfer changes, in scenario order.
    pub plans: Vec<AllocationPlan>,
    pub report: RunReport,
    pub summary: RunSummary,
    #[serde(skip)]
    pub channels: ChannelTable,
}

/// Validates `config`, then allocates each transfer in order, initializes dynamics,
/// and runs every event through a [`SwingEngine`].
///
/// # Errors
///
/// [`SessionError::Config`] with every validation failure, otherwise the
/// first allocation, scheduling, or engine error.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioOutcome, SessionError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(SessionError::Config(errors));
    }

    let engine = SwingEngine::new(config.build_network(), config.swing_settings());
    let mut session = SimulationSession::new(engine);

    let mut plans = Vec::with_capacity(config.transfers.len());
    for t in &config.transfers {
        session = session.with_allocator(CapacityAllocator::new(t.tolerance_mw), t.accept_partial);
        plans.push(session.set_transfer(t.bus, t.target_mw)?);
    }

    session.prepare(&config.channel_requests(), &config.dynamics_params())?;
    for spec in &config.events {
        session.add_event_spec(spec.clone())?;
    }

    let report = session.run(config.simulation.end_time_s)?;
    let channels = session.channels()?;
    let summary = RunSummary::from_table(&channels, config.simulation.nominal_hz);
    info!(
        samples = summary.samples,
        nadir_hz = summary.nadir_hz,
        "scenario finished"
    );

    Ok(ScenarioOutcome {
        plans,
        report,
        summary,
        channels,
    })
}
