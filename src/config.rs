//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::swing::SwingSettings;
use crate::engine::{ChannelRequest, DynamicsParams, Quantity};
use crate::model::{
    AreaId, BranchRecord, BusId, BusRecord, GeneratorId, LoadId, LoadRecord, MachineRecord,
    NetworkModel,
};
use crate::sim::event::{EventSpec, KindCode};

/// Top-level scenario configuration parsed from TOML.
///
/// Sections left out of a file take their values from the `two_area`
/// preset, except `transfers` and `events`, which are empty unless written.
/// Load from TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::two_area`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, integration step, and global parameters.
    pub simulation: SimulationConfig,
    /// Dynamic model parameters.
    pub dynamics: DynamicsConfig,
    pub buses: Vec<BusConfig>,
    pub generators: Vec<GeneratorConfig>,
    pub loads: Vec<LoadConfig>,
    pub branches: Vec<BranchConfig>,
    /// Transfer changes applied in order before the dynamic run.
    #[serde(default)]
    pub transfers: Vec<TransferConfig>,
    /// Disturbances applied during the dynamic run.
    #[serde(default)]
    pub events: Vec<EventSpec>,
    /// Channels recorded during the dynamic run.
    pub monitor: MonitorConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::two_area()
    }
}

/// Run length, integration step, and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated end time (s, must be > 0).
    pub end_time_s: f64,
    /// Integration time step (s).
    pub time_step_s: f64,
    /// Seed for measurement noise.
    pub seed: u64,
    /// Standard deviation of measurement noise on recorded channels.
    pub noise_std: f64,
    /// Frequency excursion at which the run is declared diverged (Hz).
    pub frequency_limit_hz: f64,
    /// Nominal system frequency (Hz).
    pub nominal_hz: f64,
    /// Bus whose machines balance the static case.
    pub slack_bus: Option<BusId>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            end_time_s: 20.0,
            time_step_s: 0.005,
            seed: 42,
            noise_std: 0.0,
            frequency_limit_hz: 5.0,
            nominal_hz: 50.0,
            slack_bus: Some(BusId(3100)),
        }
    }
}

/// Dynamic model parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DynamicsConfig {
    /// Load frequency sensitivity (p.u./p.u.).
    pub load_damping: f64,
    /// First-order governor time constant (s).
    pub governor_time_constant_s: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        let params = DynamicsParams::default();
        Self {
            load_damping: params.load_damping,
            governor_time_constant_s: params.governor_time_constant_s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    pub id: BusId,
    pub area: AreaId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub bus: BusId,
    /// Machine label on the bus.
    #[serde(default = "default_label")]
    pub id: String,
    pub p_mw: f64,
    pub p_max_mw: f64,
    /// Machine rating (MVA).
    pub mbase_mva: f64,
    /// Inertia constant (s).
    pub h_s: f64,
    /// Governor droop (p.u.); zero disables primary response.
    #[serde(default = "default_droop")]
    pub droop: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    pub bus: BusId,
    #[serde(default = "default_label")]
    pub id: String,
    pub p_mw: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchConfig {
    pub from: BusId,
    pub to: BusId,
    #[serde(default = "default_label")]
    pub circuit: String,
}

/// Transfer change at one bus, carried by the first load record there.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    pub bus: BusId,
    /// New active power of the transfer load (MW).
    pub target_mw: f64,
    /// Shortfall tolerated before allocation is reported as insufficient (MW).
    #[serde(default)]
    pub tolerance_mw: f64,
    /// Apply the best achievable plan when the fleet runs out of capacity.
    #[serde(default)]
    pub accept_partial: bool,
}

/// Channels recorded during the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Buses for the bus-level quantities.
    pub buses: Vec<BusId>,
    pub quantities: Vec<Quantity>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buses: Vec::new(),
            quantities: vec![Quantity::Frequency],
        }
    }
}

fn default_label() -> String {
    "1".to_string()
}

fn default_droop() -> f64 {
    0.05
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.end_time_s"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn bus(id: u32, area: u32) -> BusConfig {
    BusConfig {
        id: BusId(id),
        area: AreaId(area),
    }
}

fn machine(bus: u32, id: &str, p_mw: f64, p_max_mw: f64, mbase_mva: f64, h_s: f64) -> GeneratorConfig {
    GeneratorConfig {
        bus: BusId(bus),
        id: id.to_string(),
        p_mw,
        p_max_mw,
        mbase_mva,
        h_s,
        droop: default_droop(),
    }
}

fn load(bus: u32, id: &str, p_mw: f64) -> LoadConfig {
    LoadConfig {
        bus: BusId(bus),
        id: id.to_string(),
        p_mw,
    }
}

fn branch(from: u32, to: u32) -> BranchConfig {
    BranchConfig {
        from: BusId(from),
        to: BusId(to),
        circuit: default_label(),
    }
}

fn event(time_s: f64, kind: &str, bus: u32) -> EventSpec {
    EventSpec {
        time_s,
        kind: KindCode::Name(kind.to_string()),
        bus: BusId(bus),
        to_bus: None,
        circuit: None,
        step_mw: None,
    }
}

impl ScenarioConfig {
    /// Returns the two-area preset: an HVDC import at bus 7000 raised from
    /// 100 to 250 MW, then a load step and a line trip in area 2.
    pub fn two_area() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            dynamics: DynamicsConfig::default(),
            buses: vec![
                bus(3100, 1),
                bus(3300, 1),
                bus(3359, 1),
                bus(5600, 2),
                bus(6000, 2),
                bus(6500, 2),
                bus(7000, 2),
            ],
            generators: vec![
                machine(3100, "1", 600.0, 900.0, 1000.0, 6.0),
                machine(3300, "1", 400.0, 600.0, 700.0, 5.0),
                machine(5600, "1", 300.0, 500.0, 600.0, 4.5),
                machine(6000, "1", 250.0, 300.0, 350.0, 4.0),
                machine(6000, "2", 150.0, 200.0, 250.0, 3.5),
            ],
            loads: vec![
                load(3359, "1", 700.0),
                load(3359, "2", 300.0),
                load(6500, "1", 400.0),
                load(6500, "2", 200.0),
                load(7000, "1", 100.0),
            ],
            branches: vec![
                branch(3100, 3300),
                branch(3300, 3359),
                branch(3359, 5600),
                branch(5600, 6000),
                branch(6000, 6500),
                branch(6500, 7000),
            ],
            transfers: vec![TransferConfig {
                bus: BusId(7000),
                target_mw: 250.0,
                tolerance_mw: 0.0,
                accept_partial: false,
            }],
            events: vec![
                EventSpec {
                    step_mw: Some(60.0),
                    ..event(1.0, "load_step", 6500)
                },
                EventSpec {
                    to_bus: Some(BusId(6000)),
                    ..event(5.0, "branch_trip", 6500)
                },
            ],
            monitor: MonitorConfig {
                buses: vec![BusId(3100), BusId(6000), BusId(6500)],
                quantities: vec![Quantity::Frequency, Quantity::Pelec, Quantity::Load],
            },
        }
    }

    /// Returns the load-step preset: simultaneous load steps in both areas
    /// with no transfer change.
    pub fn load_step() -> Self {
        let base = Self::two_area();
        Self {
            simulation: SimulationConfig {
                end_time_s: 15.0,
                ..SimulationConfig::default()
            },
            transfers: Vec::new(),
            events: vec![
                EventSpec {
                    step_mw: Some(150.0),
                    ..event(2.0, "load_step", 3359)
                },
                EventSpec {
                    step_mw: Some(50.0),
                    ..event(2.0, "load_step", 6500)
                },
            ],
            monitor: MonitorConfig {
                buses: vec![BusId(3359), BusId(6500)],
                quantities: vec![Quantity::Frequency, Quantity::Load],
            },
            ..base
        }
    }

    /// Returns the islanding preset: the HVDC import is switched off, then
    /// the inter-area tie opens together with the loss of generator bus 6000.
    pub fn islanding() -> Self {
        let base = Self::two_area();
        Self {
            simulation: SimulationConfig {
                end_time_s: 10.0,
                noise_std: 0.001,
                ..SimulationConfig::default()
            },
            transfers: vec![TransferConfig {
                bus: BusId(7000),
                target_mw: 0.0,
                tolerance_mw: 0.0,
                accept_partial: true,
            }],
            events: vec![
                EventSpec {
                    to_bus: Some(BusId(3359)),
                    ..event(2.0, "branch_trip", 5600)
                },
                event(2.0, "bus_trip", 6000),
            ],
            monitor: MonitorConfig {
                buses: vec![BusId(3100), BusId(5600)],
                quantities: vec![Quantity::Frequency, Quantity::Pmech, Quantity::Pelec],
            },
            ..base
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["two_area", "load_step", "islanding"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "two_area" => Ok(Self::two_area()),
            "load_step" => Ok(Self::load_step()),
            "islanding" => Ok(Self::islanding()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Static case described by the scenario.
    ///
    /// Branch endpoints are stored with the lower bus number first.
    pub fn build_network(&self) -> NetworkModel {
        NetworkModel {
            buses: self
                .buses
                .iter()
                .map(|b| BusRecord {
                    id: b.id,
                    area: b.area,
                })
                .collect(),
            machines: self
                .generators
                .iter()
                .map(|g| MachineRecord {
                    id: GeneratorId {
                        bus: g.bus,
                        machine: g.id.clone(),
                    },
                    p_mw: g.p_mw,
                    p_max_mw: g.p_max_mw,
                    mbase_mva: g.mbase_mva,
                    h_s: g.h_s,
                    droop: g.droop,
                })
                .collect(),
            loads: self
                .loads
                .iter()
                .map(|l| LoadRecord {
                    bus: l.bus,
                    id: LoadId::new(l.id.clone()),
                    p_mw: l.p_mw,
                })
                .collect(),
            branches: self
                .branches
                .iter()
                .map(|b| BranchRecord {
                    from: b.from.min(b.to),
                    to: b.from.max(b.to),
                    circuit: b.circuit.clone(),
                })
                .collect(),
        }
    }

    /// Settings for the reference engine.
    pub fn swing_settings(&self) -> SwingSettings {
        let s = &self.simulation;
        SwingSettings {
            nominal_hz: s.nominal_hz,
            slack_bus: s.slack_bus,
            frequency_limit_hz: s.frequency_limit_hz,
            noise_std: s.noise_std,
            seed: s.seed,
        }
    }

    /// Parameters for dynamic initialization.
    pub fn dynamics_params(&self) -> DynamicsParams {
        DynamicsParams {
            time_step_s: self.simulation.time_step_s,
            load_damping: self.dynamics.load_damping,
            governor_time_constant_s: self.dynamics.governor_time_constant_s,
        }
    }

    /// Channels to record: system frequency once, then every bus-level
    /// quantity for every monitored bus.
    pub fn channel_requests(&self) -> Vec<ChannelRequest> {
        let mut requests = Vec::new();
        if self.monitor.quantities.contains(&Quantity::Frequency) {
            requests.push(ChannelRequest::frequency());
        }
        for &bus in &self.monitor.buses {
            for &quantity in &self.monitor.quantities {
                if quantity != Quantity::Frequency {
                    requests.push(ChannelRequest::at_bus(quantity, bus));
                }
            }
        }
        requests
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Event kinds that
    /// are not recognised are accepted here and reported during the run.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !(s.end_time_s.is_finite() && s.end_time_s > 0.0) {
            errors.push(ConfigError::new("simulation.end_time_s", "must be > 0"));
        }
        if !(s.time_step_s.is_finite() && s.time_step_s > 0.0) {
            errors.push(ConfigError::new("simulation.time_step_s", "must be > 0"));
        } else if s.time_step_s > s.end_time_s {
            errors.push(ConfigError::new(
                "simulation.time_step_s",
                "must be <= simulation.end_time_s",
            ));
        }
        if s.noise_std < 0.0 {
            errors.push(ConfigError::new("simulation.noise_std", "must be >= 0"));
        }
        if s.frequency_limit_hz <= 0.0 {
            errors.push(ConfigError::new("simulation.frequency_limit_hz", "must be > 0"));
        }
        if s.nominal_hz <= 0.0 {
            errors.push(ConfigError::new("simulation.nominal_hz", "must be > 0"));
        }

        let d = &self.dynamics;
        if d.load_damping < 0.0 {
            errors.push(ConfigError::new("dynamics.load_damping", "must be >= 0"));
        }
        if d.governor_time_constant_s < 0.0 {
            errors.push(ConfigError::new(
                "dynamics.governor_time_constant_s",
                "must be >= 0",
            ));
        }

        let mut bus_ids = HashSet::new();
        if self.buses.is_empty() {
            errors.push(ConfigError::new("buses", "must not be empty"));
        }
        for (i, b) in self.buses.iter().enumerate() {
            if !bus_ids.insert(b.id) {
                errors.push(ConfigError::new(
                    format!("buses[{i}].id"),
                    format!("duplicate bus {}", b.id),
                ));
            }
        }
        let known = |field: String, bus: BusId, errors: &mut Vec<ConfigError>| {
            if !bus_ids.contains(&bus) {
                errors.push(ConfigError::new(field, format!("unknown bus {bus}")));
            }
        };

        if let Some(slack) = s.slack_bus {
            known("simulation.slack_bus".into(), slack, &mut errors);
        }

        let mut machine_ids = HashSet::new();
        for (i, g) in self.generators.iter().enumerate() {
            known(format!("generators[{i}].bus"), g.bus, &mut errors);
            if !machine_ids.insert((g.bus, g.id.as_str())) {
                errors.push(ConfigError::new(
                    format!("generators[{i}].id"),
                    format!("duplicate machine {}/{}", g.bus, g.id),
                ));
            }
            if !(g.p_max_mw.is_finite() && g.p_max_mw >= 0.0) {
                errors.push(ConfigError::new(
                    format!("generators[{i}].p_max_mw"),
                    "must be >= 0",
                ));
            }
            if !(0.0..=g.p_max_mw).contains(&g.p_mw) {
                errors.push(ConfigError::new(
                    format!("generators[{i}].p_mw"),
                    "must be in [0, p_max_mw]",
                ));
            }
            if g.mbase_mva <= 0.0 {
                errors.push(ConfigError::new(
                    format!("generators[{i}].mbase_mva"),
                    "must be > 0",
                ));
            }
            if g.h_s <= 0.0 {
                errors.push(ConfigError::new(format!("generators[{i}].h_s"), "must be > 0"));
            }
            if g.droop < 0.0 {
                errors.push(ConfigError::new(
                    format!("generators[{i}].droop"),
                    "must be >= 0",
                ));
            }
        }

        let mut load_ids = HashSet::new();
        for (i, l) in self.loads.iter().enumerate() {
            known(format!("loads[{i}].bus"), l.bus, &mut errors);
            if !load_ids.insert((l.bus, l.id.as_str())) {
                errors.push(ConfigError::new(
                    format!("loads[{i}].id"),
                    format!("duplicate load {} at bus {}", l.id, l.bus),
                ));
            }
            if !l.p_mw.is_finite() {
                errors.push(ConfigError::new(format!("loads[{i}].p_mw"), "must be finite"));
            }
        }

        for (i, b) in self.branches.iter().enumerate() {
            known(format!("branches[{i}].from"), b.from, &mut errors);
            known(format!("branches[{i}].to"), b.to, &mut errors);
            if b.from == b.to {
                errors.push(ConfigError::new(
                    format!("branches[{i}].to"),
                    "must differ from branches.from",
                ));
            }
        }

        for (i, t) in self.transfers.iter().enumerate() {
            known(format!("transfers[{i}].bus"), t.bus, &mut errors);
            if !self.loads.iter().any(|l| l.bus == t.bus) {
                errors.push(ConfigError::new(
                    format!("transfers[{i}].bus"),
                    format!("bus {} has no load record", t.bus),
                ));
            }
            if !t.target_mw.is_finite() {
                errors.push(ConfigError::new(
                    format!("transfers[{i}].target_mw"),
                    "must be finite",
                ));
            }
            if !(t.tolerance_mw >= 0.0) {
                errors.push(ConfigError::new(
                    format!("transfers[{i}].tolerance_mw"),
                    "must be >= 0",
                ));
            }
        }

        for (i, e) in self.events.iter().enumerate() {
            if !(e.time_s.is_finite() && e.time_s >= 0.0) {
                errors.push(ConfigError::new(format!("events[{i}].time_s"), "must be >= 0"));
            }
            known(format!("events[{i}].bus"), e.bus, &mut errors);
            let name = match &e.kind {
                KindCode::Code(1) => "branch_trip",
                KindCode::Code(2) => "load_step",
                KindCode::Name(name) => name.as_str(),
                _ => "",
            };
            match name {
                "branch_trip" => match e.to_bus {
                    Some(to) => known(format!("events[{i}].to_bus"), to, &mut errors),
                    None => errors.push(ConfigError::new(
                        format!("events[{i}].to_bus"),
                        "required for branch_trip",
                    )),
                },
                "load_step" if e.step_mw.is_none_or(|s| !s.is_finite()) => {
                    errors.push(ConfigError::new(
                        format!("events[{i}].step_mw"),
                        "required for load_step and must be finite",
                    ));
                }
                _ => {}
            }
        }

        for (i, &b) in self.monitor.buses.iter().enumerate() {
            known(format!("monitor.buses[{i}]"), b, &mut errors);
        }
        if self.monitor.quantities.is_empty() {
            errors.push(ConfigError::new("monitor.quantities", "must not be empty"));
        }

        errors
    }
}
