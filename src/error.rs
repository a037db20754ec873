//! Error types for the allocator, scheduler, engines, and session.

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{BusId, GeneratorId, LoadId};
use crate::sim::allocator::AllocationPlan;
use crate::sim::scheduler::SchedulerState;

/// Result alias for engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result alias for allocation.
pub type AllocResult<T> = std::result::Result<T, AllocError>;

/// Failure reported by a simulation engine.
///
/// Propagated unchanged by every caller; numerical state is unknown afterwards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("solution did not converge at t={time_s:.4} s")]
    NotConverged { time_s: f64 },
    #[error("cannot advance to t={requested_s:.4} s, engine is already at t={now_s:.4} s")]
    TimeReversal { now_s: f64, requested_s: f64 },
    #[error("dynamic simulation has not been initialized")]
    NotInitialized,
    #[error("unknown generator {0}")]
    UnknownGenerator(GeneratorId),
    #[error("unknown bus {0}")]
    UnknownBus(BusId),
    #[error("unknown load {id} at bus {bus}")]
    UnknownLoad { bus: BusId, id: LoadId },
    #[error("unknown branch {from}-{to} circuit {circuit}")]
    UnknownBranch {
        from: BusId,
        to: BusId,
        circuit: String,
    },
    #[error("output {p_mw:.3} MW for {id} is outside [0, {p_max_mw:.3}] MW")]
    OutputOutOfRange {
        id: GeneratorId,
        p_mw: f64,
        p_max_mw: f64,
    },
    #[error("engine call failed: {0}")]
    Failed(String),
}

/// Failure of a generation redistribution request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocError {
    #[error("generator fleet is empty")]
    EmptyFleet,
    #[error("transfer delta must be finite, got {delta_mw}")]
    InvalidRequest { delta_mw: f64 },
    #[error("generator {id} has invalid operating point {p_mw} MW (max {p_max_mw} MW)")]
    InvalidGeneratorState {
        id: GeneratorId,
        p_mw: f64,
        p_max_mw: f64,
    },
    /// The fleet cannot absorb the full delta. `plan` is the best achievable.
    #[error("system capacity exceeded, {shortfall_mw:.3} MW could not be placed")]
    CapacityExceeded {
        shortfall_mw: f64,
        plan: Box<AllocationPlan>,
    },
}

/// Failure or non-fatal condition raised while scheduling events.
///
/// `UnknownEventKind` and `NoLoadsAtBus` never abort a run; they are
/// recorded in the run report and the offending event is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    #[error("scheduler is {state:?}; reset it before registering or running again")]
    Locked { state: SchedulerState },
    #[error("event time must be finite and >= 0, got {time_s}")]
    InvalidTime { time_s: f64 },
    #[error("unknown event kind \"{kind}\" at t={time_s} s")]
    UnknownEventKind { kind: String, time_s: f64 },
    #[error("no load records at bus {bus} for load step at t={time_s} s")]
    NoLoadsAtBus { bus: BusId, time_s: f64 },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failure of a session-level operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("transfer target at bus {bus} must be finite, got {target_mw}")]
    InvalidTransfer { bus: BusId, target_mw: f64 },
    #[error("transfer bus {0} has no load record to carry the transfer")]
    NoTransferLoad(BusId),
    #[error("invalid scenario: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        Self::Config(vec![err])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_converts_into_scheduler_error() {
        let err: SchedulerError = EngineError::NotConverged { time_s: 1.5 }.into();
        assert!(matches!(err, SchedulerError::Engine(_)));
        assert_eq!(err.to_string(), "solution did not converge at t=1.5000 s");
    }

    #[test]
    fn messages_name_the_offender() {
        let err = AllocError::InvalidGeneratorState {
            id: GeneratorId::new(5600, "2"),
            p_mw: 90.0,
            p_max_mw: 80.0,
        };
        assert!(err.to_string().contains("5600/2"));

        let err = SchedulerError::NoLoadsAtBus {
            bus: BusId(6500),
            time_s: 10.0,
        };
        assert!(err.to_string().contains("6500"));
    }

    #[test]
    fn config_errors_are_listed() {
        let err = SessionError::Config(vec![
            ConfigError {
                field: "simulation.end_time_s".into(),
                message: "must be > 0".into(),
            },
            ConfigError {
                field: "buses".into(),
                message: "must not be empty".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "invalid scenario: simulation.end_time_s: must be > 0; buses: must not be empty"
        );
    }
}
