//! Grid data model: identifiers, generators, and static network records.

/// Dispatchable machines and output direction helpers.
pub mod generator;
pub mod network;
pub mod types;

pub use generator::{Direction, Generator, GeneratorState};
pub use network::{BranchRecord, BusRecord, LoadRecord, MachineRecord, NetworkModel};
pub use types::{AreaId, BusId, GeneratorId, LoadId};
