//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;

use transient_sim::engine::{ChannelRequest, ChannelTable, DynamicsParams, SimulationEngine};
use transient_sim::error::{EngineError, EngineResult};
use transient_sim::model::{AreaId, BusId, Generator, GeneratorId, GeneratorState, LoadId};

/// One call observed by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Advance(f64),
    TripBranch(BusId, BusId, String),
    TripBus(BusId),
    ReadLoad(BusId, LoadId),
    SetLoad(BusId, LoadId, f64),
    SetGenerator(GeneratorId, f64),
}

/// In-memory engine that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub buses: Vec<(BusId, AreaId)>,
    pub fleet: Vec<Generator>,
    pub loads: Vec<(BusId, LoadId, f64)>,
    pub calls: RefCell<Vec<Call>>,
    /// `advance_to` fails with `NotConverged` at or beyond this time.
    pub fail_at: Option<f64>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn advances(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Advance(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn load(&self, bus: u32, id: &str) -> Option<f64> {
        self.loads
            .iter()
            .find(|(b, l, _)| *b == BusId(bus) && l.0 == id)
            .map(|(_, _, p)| *p)
    }

    pub fn output(&self, bus: u32, machine: &str) -> Option<f64> {
        let id = GeneratorId::new(bus, machine);
        self.fleet.iter().find(|g| g.id == id).map(|g| g.p_mw)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl SimulationEngine for RecordingEngine {
    fn advance_to(&mut self, time_s: f64) -> EngineResult<()> {
        self.record(Call::Advance(time_s));
        match self.fail_at {
            Some(t) if time_s >= t => Err(EngineError::NotConverged { time_s }),
            _ => Ok(()),
        }
    }

    fn generators(&self) -> EngineResult<Vec<Generator>> {
        Ok(self.fleet.clone())
    }

    fn generator_state(&self, id: &GeneratorId) -> EngineResult<GeneratorState> {
        self.fleet
            .iter()
            .find(|g| &g.id == id)
            .map(|g| GeneratorState {
                p_mw: g.p_mw,
                p_max_mw: g.p_max_mw,
            })
            .ok_or_else(|| EngineError::UnknownGenerator(id.clone()))
    }

    fn set_generator_output(&mut self, id: &GeneratorId, p_mw: f64) -> EngineResult<()> {
        self.record(Call::SetGenerator(id.clone(), p_mw));
        let g = self
            .fleet
            .iter_mut()
            .find(|g| &g.id == id)
            .ok_or_else(|| EngineError::UnknownGenerator(id.clone()))?;
        g.p_mw = p_mw;
        Ok(())
    }

    fn bus_area(&self, bus: BusId) -> EngineResult<AreaId> {
        self.buses
            .iter()
            .find(|(b, _)| *b == bus)
            .map(|(_, a)| *a)
            .ok_or(EngineError::UnknownBus(bus))
    }

    fn load_ids(&self, bus: BusId) -> EngineResult<Vec<LoadId>> {
        Ok(self
            .loads
            .iter()
            .filter(|(b, _, _)| *b == bus)
            .map(|(_, id, _)| id.clone())
            .collect())
    }

    fn load_value(&self, bus: BusId, id: &LoadId) -> EngineResult<f64> {
        self.record(Call::ReadLoad(bus, id.clone()));
        self.loads
            .iter()
            .find(|(b, l, _)| *b == bus && l == id)
            .map(|(_, _, p)| *p)
            .ok_or_else(|| EngineError::UnknownLoad {
                bus,
                id: id.clone(),
            })
    }

    fn set_load_value(&mut self, bus: BusId, id: &LoadId, p_mw: f64) -> EngineResult<()> {
        self.record(Call::SetLoad(bus, id.clone(), p_mw));
        let load = self
            .loads
            .iter_mut()
            .find(|(b, l, _)| *b == bus && l == id)
            .ok_or_else(|| EngineError::UnknownLoad {
                bus,
                id: id.clone(),
            })?;
        load.2 = p_mw;
        Ok(())
    }

    fn trip_branch(&mut self, from: BusId, to: BusId, circuit: &str) -> EngineResult<()> {
        self.record(Call::TripBranch(from, to, circuit.to_string()));
        Ok(())
    }

    fn trip_bus(&mut self, bus: BusId) -> EngineResult<()> {
        self.record(Call::TripBus(bus));
        Ok(())
    }

    fn solve_power_flow(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn initialize_dynamics(&mut self, _params: &DynamicsParams) -> EngineResult<()> {
        Ok(())
    }

    fn monitor(&mut self, _request: ChannelRequest) -> EngineResult<()> {
        Ok(())
    }

    fn read_channels(&self) -> EngineResult<ChannelTable> {
        Ok(ChannelTable::default())
    }
}

/// Generator `bus/1` in `area`.
pub fn generator(bus: u32, area: u32, p_mw: f64, p_max_mw: f64) -> Generator {
    Generator::new(GeneratorId::new(bus, "1"), AreaId(area), p_mw, p_max_mw)
}

/// Two-area engine: area 1 holds G1 (100/150) and G2 (80/80), area 2 holds
/// G3 (200/400); bus 6500 carries two loads, bus 7000 one transfer load.
pub fn two_area_engine() -> RecordingEngine {
    RecordingEngine {
        buses: vec![
            (BusId(1), AreaId(1)),
            (BusId(2), AreaId(1)),
            (BusId(3), AreaId(2)),
            (BusId(6500), AreaId(2)),
            (BusId(7000), AreaId(1)),
        ],
        fleet: vec![
            generator(1, 1, 100.0, 150.0),
            generator(2, 1, 80.0, 80.0),
            generator(3, 2, 200.0, 400.0),
        ],
        loads: vec![
            (BusId(6500), LoadId::new("1"), 40.0),
            (BusId(6500), LoadId::new("2"), 60.0),
            (BusId(7000), LoadId::new("1"), 100.0),
        ],
        ..RecordingEngine::default()
    }
}
