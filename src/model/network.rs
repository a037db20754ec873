//! Static network data consumed by the reference engine.

use serde::Serialize;

use super::generator::Generator;
use super::types::{AreaId, BusId, GeneratorId, LoadId};

/// A bus and the area it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusRecord {
    pub id: BusId,
    pub area: AreaId,
}

/// A synchronous machine with the parameters the swing model needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRecord {
    pub id: GeneratorId,
    /// Scheduled active power output (MW).
    pub p_mw: f64,
    /// Maximum active power output (MW).
    pub p_max_mw: f64,
    /// Machine rating (MVA), base for `h_s` and `droop`.
    pub mbase_mva: f64,
    /// Inertia constant on machine base (s).
    pub h_s: f64,
    /// Governor droop on machine base (p.u.). Zero disables primary response.
    pub droop: f64,
}

/// A constant-power load record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRecord {
    pub bus: BusId,
    pub id: LoadId,
    pub p_mw: f64,
}

/// A branch between two buses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchRecord {
    pub from: BusId,
    pub to: BusId,
    pub circuit: String,
}

/// Complete static case: buses, machines, loads, and branches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkModel {
    pub buses: Vec<BusRecord>,
    pub machines: Vec<MachineRecord>,
    pub loads: Vec<LoadRecord>,
    pub branches: Vec<BranchRecord>,
}

impl NetworkModel {
    /// Area of `bus`, if the bus exists.
    pub fn bus_area(&self, bus: BusId) -> Option<AreaId> {
        self.buses.iter().find(|b| b.id == bus).map(|b| b.area)
    }

    /// Fleet view of every machine whose bus is known, in case order.
    pub fn generators(&self) -> Vec<Generator> {
        self.machines
            .iter()
            .filter_map(|m| {
                self.bus_area(m.id.bus)
                    .map(|area| Generator::new(m.id.clone(), area, m.p_mw, m.p_max_mw))
            })
            .collect()
    }

    /// Total scheduled generation (MW).
    pub fn total_generation_mw(&self) -> f64 {
        self.machines.iter().map(|m| m.p_mw).sum()
    }

    /// Total load (MW).
    pub fn total_load_mw(&self) -> f64 {
        self.loads.iter().map(|l| l.p_mw).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NetworkModel {
        NetworkModel {
            buses: vec![
                BusRecord {
                    id: BusId(1),
                    area: AreaId(10),
                },
                BusRecord {
                    id: BusId(2),
                    area: AreaId(20),
                },
            ],
            machines: vec![
                MachineRecord {
                    id: GeneratorId::new(1, "1"),
                    p_mw: 100.0,
                    p_max_mw: 150.0,
                    mbase_mva: 200.0,
                    h_s: 4.0,
                    droop: 0.05,
                },
                MachineRecord {
                    id: GeneratorId::new(9, "1"),
                    p_mw: 10.0,
                    p_max_mw: 20.0,
                    mbase_mva: 20.0,
                    h_s: 3.0,
                    droop: 0.05,
                },
            ],
            loads: vec![LoadRecord {
                bus: BusId(2),
                id: LoadId::new("1"),
                p_mw: 95.0,
            }],
            branches: Vec::new(),
        }
    }

    #[test]
    fn bus_area_lookup() {
        let m = model();
        assert_eq!(m.bus_area(BusId(2)), Some(AreaId(20)));
        assert_eq!(m.bus_area(BusId(3)), None);
    }

    #[test]
    fn generators_skip_machines_on_unknown_buses() {
        let fleet = model().generators();
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet[0].area, AreaId(10));
    }

    #[test]
    fn totals() {
        let m = model();
        assert_eq!(m.total_generation_mw(), 110.0);
        assert_eq!(m.total_load_mw(), 95.0);
    }
}
