//! Identifier newtypes shared by the allocator, scheduler, and engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bus number as used by the network case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub u32);

/// Control-area number a bus (and every machine on it) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub u32);

/// Load record label, unique per bus (e.g. `"1"`, `"2"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(pub String);

/// A machine is addressed by its bus plus the per-bus machine label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorId {
    /// Terminal bus of the machine.
    pub bus: BusId,
    /// Machine label on that bus.
    pub machine: String,
}

impl GeneratorId {
    /// Creates a machine identifier.
    pub fn new(bus: u32, machine: impl Into<String>) -> Self {
        Self {
            bus: BusId(bus),
            machine: machine.into(),
        }
    }
}

impl LoadId {
    /// Creates a load label.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bus, self.machine)
    }
}
