use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::BusId;

/// Circuit label used when a branch trip does not name one.
pub const DEFAULT_CIRCUIT: &str = "1";

/// A disturbance applied at a fixed simulated time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Absolute simulated time (s).
    pub time_s: f64,
    /// Bus the event acts on; for a branch trip, one of the endpoints.
    pub bus: BusId,
    pub kind: EventKind,
}

/// What an event does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Opens the branch between `bus` and `to_bus`.
    BranchTrip { to_bus: BusId, circuit: String },
    /// Disconnects `bus` and everything connected to it.
    BusTrip,
    /// Adds `step_mw` to the load at `bus`, split evenly over its records.
    LoadStep { step_mw: f64 },
}

impl EventKind {
    /// Name used in configs and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BranchTrip { .. } => "branch_trip",
            Self::BusTrip => "bus_trip",
            Self::LoadStep { .. } => "load_step",
        }
    }
}

impl Event {
    pub fn branch_trip(time_s: f64, from: BusId, to: BusId, circuit: impl Into<String>) -> Self {
        Self {
            time_s,
            bus: from,
            kind: EventKind::BranchTrip {
                to_bus: to,
                circuit: circuit.into(),
            },
        }
    }

    pub fn bus_trip(time_s: f64, bus: BusId) -> Self {
        Self {
            time_s,
            bus,
            kind: EventKind::BusTrip,
        }
    }

    pub fn load_step(time_s: f64, bus: BusId, step_mw: f64) -> Self {
        Self {
            time_s,
            bus,
            kind: EventKind::LoadStep { step_mw },
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::BranchTrip { to_bus, circuit } => write!(
                f,
                "t={}s branch_trip {}-{} ckt {}",
                self.time_s, self.bus, to_bus, circuit
            ),
            EventKind::BusTrip => write!(f, "t={}s bus_trip {}", self.time_s, self.bus),
            EventKind::LoadStep { step_mw } => write!(
                f,
                "t={}s load_step {} {:+} MW",
                self.time_s, self.bus, step_mw
            ),
        }
    }
}

/// Event kind as written in a scenario: a name or the numeric code
/// (`1` branch trip, `2` load step, `3` bus trip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindCode {
    Code(i64),
    Name(String),
}

impl fmt::Display for KindCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Loose, scenario-facing form of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventSpec {
    pub time_s: f64,
    pub kind: KindCode,
    pub bus: BusId,
    #[serde(default)]
    pub to_bus: Option<BusId>,
    #[serde(default)]
    pub circuit: Option<String>,
    #[serde(default)]
    pub step_mw: Option<f64>,
}

impl EventSpec {
    /// Resolves the spec into a queue entry.
    ///
    /// Unknown kinds, and known kinds missing a required field, become
    /// [`QueueEntry::Unrecognised`] so they surface when their instant runs.
    pub fn into_entry(self) -> QueueEntry {
        let name = match &self.kind {
            KindCode::Code(1) => "branch_trip",
            KindCode::Code(2) => "load_step",
            KindCode::Code(3) => "bus_trip",
            KindCode::Name(name) => name.as_str(),
            KindCode::Code(_) => "",
        };
        let event = match (name, self.to_bus, self.step_mw) {
            ("branch_trip", Some(to), _) => Some(Event::branch_trip(
                self.time_s,
                self.bus,
                to,
                self.circuit.as_deref().unwrap_or(DEFAULT_CIRCUIT),
            )),
            ("bus_trip", _, _) => Some(Event::bus_trip(self.time_s, self.bus)),
            ("load_step", _, Some(step)) => Some(Event::load_step(self.time_s, self.bus, step)),
            _ => None,
        };
        match event {
            Some(event) => QueueEntry::Event(event),
            None => QueueEntry::Unrecognised {
                time_s: self.time_s,
                bus: self.bus,
                kind: self.kind.to_string(),
            },
        }
    }
}

/// One registered item of the event queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum QueueEntry {
    Event(Event),
    /// A spec whose kind could not be resolved.
    Unrecognised {
        time_s: f64,
        bus: BusId,
        kind: String,
    },
}

impl QueueEntry {
    pub fn time_s(&self) -> f64 {
        match self {
            Self::Event(event) => event.time_s,
            Self::Unrecognised { time_s, .. } => *time_s,
        }
    }
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => event.fmt(f),
            Self::Unrecognised { time_s, bus, kind } => {
                write!(f, "t={time_s}s unrecognised kind \"{kind}\" at {bus}")
            }
        }
    }
}

/// All entries sharing one timestamp, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instant<'a> {
    pub time_s: f64,
    pub entries: Vec<&'a QueueEntry>,
}

/// Registered entries of one run, kept in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQueue {
    entries: Vec<QueueEntry>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Groups the entries into strictly increasing instants.
    ///
    /// The sort is stable, so co-timed entries keep registration order.
    pub fn instants(&self) -> Vec<Instant<'_>> {
        let mut sorted: Vec<&QueueEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.time_s().total_cmp(&b.time_s()));

        let mut instants: Vec<Instant<'_>> = Vec::new();
        for entry in sorted {
            match instants.last_mut() {
                Some(last) if last.time_s == entry.time_s() => last.entries.push(entry),
                _ => instants.push(Instant {
                    time_s: entry.time_s(),
                    entries: vec![entry],
                }),
            }
        }
        instants
    }
}
