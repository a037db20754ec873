use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::power_balance::{accelerating_power_mw, droop_target_mw};
use super::{ChannelRequest, ChannelTable, DynamicsParams, Quantity, SimulationEngine};
use crate::error::{EngineError, EngineResult};
use crate::model::{AreaId, BusId, Generator, GeneratorId, GeneratorState, LoadId, NetworkModel};

/// Time comparisons closer than this are treated as equal.
const TIME_EPS: f64 = 1e-9;

/// Residual mismatch the slack may leave after the static solve (MW).
const SLACK_TOLERANCE_MW: f64 = 1e-6;

/// Settings of the reference engine that do not come from the case data.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingSettings {
    /// Nominal system frequency (Hz).
    pub nominal_hz: f64,
    /// Bus whose machines close the static power balance.
    pub slack_bus: Option<BusId>,
    /// Frequency excursion treated as loss of synchronism (Hz).
    pub frequency_limit_hz: f64,
    /// Standard deviation of the measurement noise added to channels.
    pub noise_std: f64,
    /// Seed for the measurement noise.
    pub seed: u64,
}

impl Default for SwingSettings {
    fn default() -> Self {
        Self {
            nominal_hz: 50.0,
            slack_bus: None,
            frequency_limit_hz: 5.0,
            noise_std: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct DynamicState {
    params: DynamicsParams,
    time_s: f64,
    /// Frequency deviation from nominal (p.u.).
    freq_dev_pu: f64,
    /// Rate of change of frequency from the last step (p.u./s).
    dfdt_pu: f64,
    /// Mechanical power per machine, indexed like `NetworkModel::machines`.
    pmech_mw: Vec<f64>,
}

/// Lumped single-frequency grid model.
///
/// All machines share one rotor speed (aggregate swing equation) and follow
/// first-order droop governors; loads are constant power with a frequency
/// damping term. Branch topology is tracked but does not influence the
/// solution, so a branch trip only changes in-service state.
pub struct SwingEngine {
    network: NetworkModel,
    settings: SwingSettings,
    rng: StdRng,
    tripped_buses: HashSet<BusId>,
    open_branches: Vec<usize>,
    monitored: Vec<ChannelRequest>,
    table: ChannelTable,
    dynamics: Option<DynamicState>,
}

impl SwingEngine {
    /// Creates an engine over a static case.
    pub fn new(network: NetworkModel, settings: SwingSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self {
            network,
            settings,
            rng,
            tripped_buses: HashSet::new(),
            open_branches: Vec::new(),
            monitored: Vec::new(),
            table: ChannelTable::default(),
            dynamics: None,
        }
    }

    /// Static case as currently modified.
    pub fn network(&self) -> &NetworkModel {
        &self.network
    }

    /// Current simulated time (s); zero before dynamics start.
    pub fn time_s(&self) -> f64 {
        self.dynamics.as_ref().map_or(0.0, |d| d.time_s)
    }

    /// Current system frequency (Hz).
    pub fn frequency_hz(&self) -> f64 {
        let dev = self.dynamics.as_ref().map_or(0.0, |d| d.freq_dev_pu);
        self.settings.nominal_hz * (1.0 + dev)
    }

    /// Returns `true` if the branch is out of service.
    pub fn is_branch_open(&self, from: BusId, to: BusId, circuit: &str) -> bool {
        self.branch_index(from, to, circuit)
            .is_some_and(|i| self.open_branches.contains(&i))
    }

    /// Returns `true` if the bus has been tripped.
    pub fn is_bus_tripped(&self, bus: BusId) -> bool {
        self.tripped_buses.contains(&bus)
    }

    fn branch_index(&self, from: BusId, to: BusId, circuit: &str) -> Option<usize> {
        self.network
            .branches
            .iter()
            .position(|b| b.from == from && b.to == to && b.circuit == circuit)
    }

    fn machine_index(&self, id: &GeneratorId) -> EngineResult<usize> {
        self.network
            .machines
            .iter()
            .position(|m| &m.id == id && !self.tripped_buses.contains(&m.id.bus))
            .ok_or_else(|| EngineError::UnknownGenerator(id.clone()))
    }

    fn load_index(&self, bus: BusId, id: &LoadId) -> EngineResult<usize> {
        self.network
            .loads
            .iter()
            .position(|l| l.bus == bus && &l.id == id && !self.tripped_buses.contains(&bus))
            .ok_or_else(|| EngineError::UnknownLoad {
                bus,
                id: id.clone(),
            })
    }

    fn require_bus(&self, bus: BusId) -> EngineResult<AreaId> {
        self.network
            .bus_area(bus)
            .ok_or(EngineError::UnknownBus(bus))
    }

    fn machine_online(&self, index: usize) -> bool {
        !self
            .tripped_buses
            .contains(&self.network.machines[index].id.bus)
    }

    fn machine_output_mw(&self, index: usize) -> f64 {
        match &self.dynamics {
            Some(d) => d.pmech_mw[index],
            None => self.network.machines[index].p_mw,
        }
    }

    fn online_load_mw(&self) -> f64 {
        self.network
            .loads
            .iter()
            .filter(|l| !self.tripped_buses.contains(&l.bus))
            .map(|l| l.p_mw)
            .sum()
    }

    /// Advances the state by one explicit Euler step of length `h`.
    fn integrate(&mut self, h: f64) -> EngineResult<()> {
        let online: Vec<usize> = (0..self.network.machines.len())
            .filter(|&i| self.machine_online(i))
            .collect();
        let load_mw = self.online_load_mw();
        let Some(state) = self.dynamics.as_mut() else {
            return Err(EngineError::NotInitialized);
        };

        let inertia: f64 = online
            .iter()
            .map(|&i| {
                let m = &self.network.machines[i];
                m.h_s * m.mbase_mva
            })
            .sum();
        if inertia <= 0.0 {
            return Err(EngineError::NotConverged {
                time_s: state.time_s,
            });
        }

        let pmech: f64 = online.iter().map(|&i| state.pmech_mw[i]).sum();
        let pacc = accelerating_power_mw(pmech, load_mw, state.params.load_damping, state.freq_dev_pu);
        let dfdt = pacc / (2.0 * inertia);

        let tg = state.params.governor_time_constant_s;
        for &i in &online {
            let m = &self.network.machines[i];
            let target = droop_target_mw(m.p_mw, m.p_max_mw, m.mbase_mva, m.droop, state.freq_dev_pu);
            let pm = &mut state.pmech_mw[i];
            if tg > 0.0 {
                *pm += h * (target - *pm) / tg;
            } else {
                *pm = target;
            }
        }

        state.freq_dev_pu += h * dfdt;
        state.dfdt_pu = dfdt;
        state.time_s += h;

        let excursion_hz = (state.freq_dev_pu * self.settings.nominal_hz).abs();
        if !excursion_hz.is_finite() || excursion_hz > self.settings.frequency_limit_hz {
            return Err(EngineError::NotConverged {
                time_s: state.time_s,
            });
        }
        Ok(())
    }

    fn channel_value(&self, request: &ChannelRequest) -> f64 {
        let Some(state) = &self.dynamics else {
            return f64::NAN;
        };
        let at_bus = |bus: Option<BusId>, i: usize| {
            bus.is_some_and(|b| self.network.machines[i].id.bus == b) && self.machine_online(i)
        };
        match request.quantity {
            Quantity::Frequency => self.settings.nominal_hz * (1.0 + state.freq_dev_pu),
            Quantity::Pmech => (0..self.network.machines.len())
                .filter(|&i| at_bus(request.bus, i))
                .map(|i| state.pmech_mw[i])
                .sum(),
            Quantity::Pelec => (0..self.network.machines.len())
                .filter(|&i| at_bus(request.bus, i))
                .map(|i| {
                    let m = &self.network.machines[i];
                    state.pmech_mw[i] - 2.0 * m.h_s * m.mbase_mva * state.dfdt_pu
                })
                .sum(),
            Quantity::Load => self
                .network
                .loads
                .iter()
                .filter(|l| Some(l.bus) == request.bus && !self.tripped_buses.contains(&l.bus))
                .map(|l| l.p_mw)
                .sum(),
        }
    }

    fn record_sample(&mut self) {
        let time_s = self.time_s();
        let mut values: Vec<f64> = self
            .monitored
            .iter()
            .map(|request| self.channel_value(request))
            .collect();
        let std_dev = self.settings.noise_std;
        for v in &mut values {
            *v += gaussian_noise(&mut self.rng, std_dev);
        }
        self.table.push_row(time_s, &values);
    }
}

impl SimulationEngine for SwingEngine {
    fn advance_to(&mut self, time_s: f64) -> EngineResult<()> {
        let (now_s, dt) = match &self.dynamics {
            Some(d) => (d.time_s, d.params.time_step_s),
            None => return Err(EngineError::NotInitialized),
        };
        if time_s < now_s - TIME_EPS {
            return Err(EngineError::TimeReversal {
                now_s,
                requested_s: time_s,
            });
        }

        let mut now = now_s;
        while now + TIME_EPS < time_s {
            let h = dt.min(time_s - now);
            self.integrate(h)?;
            self.record_sample();
            now = self.time_s();
        }
        debug!(time_s, frequency_hz = self.frequency_hz(), "advanced");
        Ok(())
    }

    fn generators(&self) -> EngineResult<Vec<Generator>> {
        self.network
            .machines
            .iter()
            .enumerate()
            .filter(|(i, _)| self.machine_online(*i))
            .map(|(i, m)| {
                let area = self.require_bus(m.id.bus)?;
                Ok(Generator::new(
                    m.id.clone(),
                    area,
                    self.machine_output_mw(i),
                    m.p_max_mw,
                ))
            })
            .collect()
    }

    fn generator_state(&self, id: &GeneratorId) -> EngineResult<GeneratorState> {
        let i = self.machine_index(id)?;
        Ok(GeneratorState {
            p_mw: self.machine_output_mw(i),
            p_max_mw: self.network.machines[i].p_max_mw,
        })
    }

    fn set_generator_output(&mut self, id: &GeneratorId, p_mw: f64) -> EngineResult<()> {
        let i = self.machine_index(id)?;
        let p_max_mw = self.network.machines[i].p_max_mw;
        if !p_mw.is_finite() || p_mw < 0.0 || p_mw > p_max_mw {
            return Err(EngineError::OutputOutOfRange {
                id: id.clone(),
                p_mw,
                p_max_mw,
            });
        }
        // During dynamics this moves the governor setpoint; the mechanical
        // power follows through the governor lag.
        self.network.machines[i].p_mw = p_mw;
        Ok(())
    }

    fn bus_area(&self, bus: BusId) -> EngineResult<AreaId> {
        self.require_bus(bus)
    }

    fn load_ids(&self, bus: BusId) -> EngineResult<Vec<LoadId>> {
        self.require_bus(bus)?;
        if self.tripped_buses.contains(&bus) {
            return Ok(Vec::new());
        }
        Ok(self
            .network
            .loads
            .iter()
            .filter(|l| l.bus == bus)
            .map(|l| l.id.clone())
            .collect())
    }

    fn load_value(&self, bus: BusId, id: &LoadId) -> EngineResult<f64> {
        let i = self.load_index(bus, id)?;
        Ok(self.network.loads[i].p_mw)
    }

    fn set_load_value(&mut self, bus: BusId, id: &LoadId, p_mw: f64) -> EngineResult<()> {
        let i = self.load_index(bus, id)?;
        self.network.loads[i].p_mw = p_mw;
        Ok(())
    }

    fn trip_branch(&mut self, from: BusId, to: BusId, circuit: &str) -> EngineResult<()> {
        let i = self
            .branch_index(from, to, circuit)
            .ok_or_else(|| EngineError::UnknownBranch {
                from,
                to,
                circuit: circuit.to_string(),
            })?;
        if !self.open_branches.contains(&i) {
            self.open_branches.push(i);
        }
        info!(%from, %to, circuit, time_s = self.time_s(), "branch tripped");
        Ok(())
    }

    fn trip_bus(&mut self, bus: BusId) -> EngineResult<()> {
        self.require_bus(bus)?;
        self.tripped_buses.insert(bus);
        for (i, b) in self.network.branches.iter().enumerate() {
            if (b.from == bus || b.to == bus) && !self.open_branches.contains(&i) {
                self.open_branches.push(i);
            }
        }
        info!(%bus, time_s = self.time_s(), "bus tripped");
        Ok(())
    }

    fn solve_power_flow(&mut self) -> EngineResult<()> {
        let Some(slack) = self.settings.slack_bus else {
            return Ok(());
        };
        self.require_bus(slack)?;

        let generation: f64 = (0..self.network.machines.len())
            .filter(|&i| self.machine_online(i))
            .map(|i| self.network.machines[i].p_mw)
            .sum();
        let mut mismatch = self.online_load_mw() - generation;

        for m in self
            .network
            .machines
            .iter_mut()
            .filter(|m| m.id.bus == slack && !self.tripped_buses.contains(&slack))
        {
            let new_p = (m.p_mw + mismatch).clamp(0.0, m.p_max_mw);
            mismatch -= new_p - m.p_mw;
            m.p_mw = new_p;
        }

        if mismatch.abs() > SLACK_TOLERANCE_MW {
            return Err(EngineError::NotConverged { time_s: 0.0 });
        }
        debug!(%slack, "static balance closed at slack bus");
        Ok(())
    }

    fn initialize_dynamics(&mut self, params: &DynamicsParams) -> EngineResult<()> {
        if params.time_step_s.is_nan() || params.time_step_s <= 0.0 {
            return Err(EngineError::Failed(format!(
                "time step must be > 0, got {}",
                params.time_step_s
            )));
        }
        self.dynamics = Some(DynamicState {
            params: params.clone(),
            time_s: 0.0,
            freq_dev_pu: 0.0,
            dfdt_pu: 0.0,
            pmech_mw: self.network.machines.iter().map(|m| m.p_mw).collect(),
        });
        self.table = ChannelTable::with_labels(self.monitored.iter().map(ChannelRequest::label));
        self.record_sample();
        Ok(())
    }

    fn monitor(&mut self, request: ChannelRequest) -> EngineResult<()> {
        if self.dynamics.is_some() {
            return Err(EngineError::Failed(
                "channels must be added before dynamics are initialized".to_string(),
            ));
        }
        match (request.quantity, request.bus) {
            (Quantity::Frequency, _) => {}
            (_, Some(bus)) => {
                self.require_bus(bus)?;
            }
            (quantity, None) => {
                return Err(EngineError::Failed(format!(
                    "{} channel requires a bus",
                    quantity.tag()
                )));
            }
        }
        if !self.monitored.contains(&request) {
            self.monitored.push(request);
        }
        Ok(())
    }

    fn read_channels(&self) -> EngineResult<ChannelTable> {
        Ok(self.table.clone())
    }
}

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
