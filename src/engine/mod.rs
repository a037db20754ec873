//! Simulation engine interface and the channel data it produces.
//!
//! The allocator and scheduler never talk to a solver directly; everything
//! goes through [`SimulationEngine`], so any solver binding (or a test fake)
//! can sit behind it. [`swing::SwingEngine`] is the bundled reference model.

pub mod power_balance;
/// Lumped single-frequency reference engine.
pub mod swing;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::model::{AreaId, BusId, Generator, GeneratorId, GeneratorState, LoadId};

/// Quantity recorded by a monitoring channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// System frequency (Hz).
    Frequency,
    /// Mechanical power of the machines at a bus (MW).
    Pmech,
    /// Electrical power of the machines at a bus (MW).
    Pelec,
    /// Total load at a bus (MW).
    Load,
}

impl Quantity {
    /// Short upper-case tag used in channel labels.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Frequency => "FREQ",
            Self::Pmech => "PMECH",
            Self::Pelec => "PELEC",
            Self::Load => "LOAD",
        }
    }
}

/// A channel to record during the dynamic run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub quantity: Quantity,
    /// Bus the quantity is measured at; `None` for system-wide quantities.
    pub bus: Option<BusId>,
}

impl ChannelRequest {
    /// System frequency channel.
    pub fn frequency() -> Self {
        Self {
            quantity: Quantity::Frequency,
            bus: None,
        }
    }

    /// Bus-level channel.
    pub fn at_bus(quantity: Quantity, bus: BusId) -> Self {
        Self {
            quantity,
            bus: Some(bus),
        }
    }

    /// Column label, e.g. `FREQ` or `PELEC 6000`.
    pub fn label(&self) -> String {
        match self.bus {
            Some(bus) => format!("{} {bus}", self.quantity.tag()),
            None => self.quantity.tag().to_string(),
        }
    }
}

impl fmt::Display for ChannelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Settings applied when converting the solved case for dynamic simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicsParams {
    /// Integration time step (s).
    pub time_step_s: f64,
    /// Load frequency sensitivity (p.u. load change per p.u. frequency change).
    pub load_damping: f64,
    /// First-order governor time constant (s).
    pub governor_time_constant_s: f64,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            time_step_s: 0.005,
            load_damping: 1.0,
            governor_time_constant_s: 0.5,
        }
    }
}

/// One recorded channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub label: String,
    pub values: Vec<f64>,
}

/// Time-series table read back after a run: a time column plus channels of
/// equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelTable {
    pub time_s: Vec<f64>,
    pub channels: Vec<Channel>,
}

impl ChannelTable {
    /// Creates an empty table with the given channel labels.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            time_s: Vec::new(),
            channels: labels
                .into_iter()
                .map(|label| Channel {
                    label: label.into(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Appends one sample row. Extra values are ignored, missing ones become `NaN`.
    pub fn push_row(&mut self, time_s: f64, values: &[f64]) {
        self.time_s.push(time_s);
        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.values.push(values.get(i).copied().unwrap_or(f64::NAN));
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    /// Returns `true` when no samples were recorded.
    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Values of the channel with `label`, if recorded.
    pub fn channel(&self, label: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.values.as_slice())
    }

    /// Copy of the samples with `from_s <= t <= to_s`.
    pub fn window(&self, from_s: f64, to_s: f64) -> Self {
        let keep: Vec<usize> = self
            .time_s
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= from_s && **t <= to_s)
            .map(|(i, _)| i)
            .collect();
        Self {
            time_s: keep.iter().map(|&i| self.time_s[i]).collect(),
            channels: self
                .channels
                .iter()
                .map(|c| Channel {
                    label: c.label.clone(),
                    values: keep.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }
}

/// A sequential grid simulation engine.
///
/// Every call mutates simulated state and completes before the next one is
/// issued. Failures are reported as [`crate::error::EngineError`] and leave
/// the engine state unspecified.
pub trait SimulationEngine {
    /// Runs the solver forward to absolute simulated time `time_s`.
    fn advance_to(&mut self, time_s: f64) -> EngineResult<()>;

    /// Snapshot of every in-service machine with its area, in case order.
    fn generators(&self) -> EngineResult<Vec<Generator>>;

    /// Operating point of one machine.
    fn generator_state(&self, id: &GeneratorId) -> EngineResult<GeneratorState>;

    /// Sets the scheduled active power output of one machine.
    fn set_generator_output(&mut self, id: &GeneratorId, p_mw: f64) -> EngineResult<()>;

    /// Area a bus belongs to.
    fn bus_area(&self, bus: BusId) -> EngineResult<AreaId>;

    /// Labels of the in-service load records at `bus`, in case order.
    fn load_ids(&self, bus: BusId) -> EngineResult<Vec<LoadId>>;

    /// Present active power of one load record (MW).
    fn load_value(&self, bus: BusId, id: &LoadId) -> EngineResult<f64>;

    /// Sets the active power of one load record (MW).
    fn set_load_value(&mut self, bus: BusId, id: &LoadId, p_mw: f64) -> EngineResult<()>;

    /// Opens the branch `from`-`to`, circuit `circuit`.
    fn trip_branch(&mut self, from: BusId, to: BusId, circuit: &str) -> EngineResult<()>;

    /// Disconnects a bus together with everything connected to it.
    fn trip_bus(&mut self, bus: BusId) -> EngineResult<()>;

    /// Solves the static case before dynamics are initialized.
    fn solve_power_flow(&mut self) -> EngineResult<()>;

    /// Converts the solved case for dynamic simulation.
    fn initialize_dynamics(&mut self, params: &DynamicsParams) -> EngineResult<()>;

    /// Adds a channel to record during the dynamic run.
    fn monitor(&mut self, request: ChannelRequest) -> EngineResult<()>;

    /// Recorded channel data.
    fn read_channels(&self) -> EngineResult<ChannelTable>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_labels() {
        assert_eq!(ChannelRequest::frequency().label(), "FREQ");
        assert_eq!(
            ChannelRequest::at_bus(Quantity::Pelec, BusId(6000)).label(),
            "PELEC 6000"
        );
    }

    #[test]
    fn push_row_pads_missing_values() {
        let mut table = ChannelTable::with_labels(["A", "B"]);
        table.push_row(0.0, &[1.0]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.channel("A"), Some(&[1.0][..]));
        assert!(table.channel("B").is_some_and(|v| v[0].is_nan()));
        assert_eq!(table.channel("C"), None);
    }

    #[test]
    fn window_is_inclusive() {
        let mut table = ChannelTable::with_labels(["FREQ"]);
        for i in 0..10 {
            table.push_row(i as f64, &[50.0 - i as f64 * 0.01]);
        }
        let w = table.window(2.0, 4.0);
        assert_eq!(w.time_s, vec![2.0, 3.0, 4.0]);
        assert_eq!(w.channel("FREQ").map(<[f64]>::len), Some(3));
    }
}
