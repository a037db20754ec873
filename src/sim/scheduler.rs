//! Discrete-event driver for a dynamic simulation run.
//!
//! The scheduler turns the registered events into a sequence of
//! `advance_to` calls and event batches issued against a
//! [`SimulationEngine`]. Every entry sharing a timestamp is applied before
//! time moves on, in the order it was registered.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use super::event::{Event, EventKind, EventQueue, EventSpec, QueueEntry};
use crate::engine::SimulationEngine;
use crate::error::SchedulerError;
use crate::model::BusId;

/// Lifecycle of an [`EventScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Nothing registered.
    Idle,
    /// Entries registered, run not started.
    Armed,
    /// A run is in progress.
    Running,
    /// A run finished, successfully or not.
    Completed,
}

/// An entry that was reached but not applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub entry: QueueEntry,
    #[serde(serialize_with = "serialize_display")]
    pub reason: SchedulerError,
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Time the run was asked to reach (s).
    pub end_time_s: f64,
    /// Timestamps at which event batches were applied, ascending.
    pub instants: Vec<f64>,
    /// Number of `advance_to` calls issued.
    pub advances: usize,
    /// Number of events applied to the engine.
    pub dispatched: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Entries scheduled after `end_time_s`.
    pub not_reached: Vec<QueueEntry>,
}

impl RunReport {
    fn new(end_time_s: f64) -> Self {
        Self {
            end_time_s,
            instants: Vec::new(),
            advances: 0,
            dispatched: 0,
            skipped: Vec::new(),
            not_reached: Vec::new(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ---")?;
        writeln!(f, "End time:          {:.3} s", self.end_time_s)?;
        writeln!(f, "Event instants:    {}", self.instants.len())?;
        writeln!(f, "Engine advances:   {}", self.advances)?;
        writeln!(f, "Events applied:    {}", self.dispatched)?;
        writeln!(f, "Events skipped:    {}", self.skipped.len())?;
        for s in &self.skipped {
            writeln!(f, "  {} ({})", s.entry, s.reason)?;
        }
        write!(f, "Not reached:       {}", self.not_reached.len())?;
        for entry in &self.not_reached {
            write!(f, "\n  {entry}")?;
        }
        Ok(())
    }
}

/// Owns the pending events of one run and drives the engine through them.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    queue: EventQueue,
    state: SchedulerState,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Registered entries.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Schedules a typed event.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Locked`] once a run has started, and
    /// [`SchedulerError::InvalidTime`] for a negative or non-finite time.
    pub fn register(&mut self, event: Event) -> Result<(), SchedulerError> {
        self.push(QueueEntry::Event(event))
    }

    /// Schedules a scenario event spec. Unknown kinds are accepted and
    /// reported when their instant runs.
    pub fn register_spec(&mut self, spec: EventSpec) -> Result<(), SchedulerError> {
        self.push(spec.into_entry())
    }

    fn push(&mut self, entry: QueueEntry) -> Result<(), SchedulerError> {
        self.ensure_open()?;
        let time_s = entry.time_s();
        if !time_s.is_finite() || time_s < 0.0 {
            return Err(SchedulerError::InvalidTime { time_s });
        }
        debug!(%entry, "registered");
        self.queue.push(entry);
        self.state = SchedulerState::Armed;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SchedulerError> {
        match self.state {
            SchedulerState::Running | SchedulerState::Completed => Err(SchedulerError::Locked {
                state: self.state,
            }),
            SchedulerState::Idle | SchedulerState::Armed => Ok(()),
        }
    }

    /// Clears the queue and returns to [`SchedulerState::Idle`].
    pub fn reset(&mut self) {
        self.queue.clear();
        self.state = SchedulerState::Idle;
    }

    /// Runs the engine from its current time to `end_time_s`, applying every
    /// registered event on the way.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Locked`] if the scheduler already ran,
    /// [`SchedulerError::InvalidTime`] for a bad end time, and
    /// [`SchedulerError::Engine`] for the first failing engine call. The
    /// scheduler is [`SchedulerState::Completed`] afterwards in every case
    /// except `Locked`.
    pub fn run<E>(&mut self, end_time_s: f64, engine: &mut E) -> Result<RunReport, SchedulerError>
    where
        E: SimulationEngine + ?Sized,
    {
        self.ensure_open()?;
        if !end_time_s.is_finite() || end_time_s < 0.0 {
            return Err(SchedulerError::InvalidTime { time_s: end_time_s });
        }

        self.state = SchedulerState::Running;
        let result = self.execute(end_time_s, engine);
        self.state = SchedulerState::Completed;

        match &result {
            Ok(report) => info!(
                end_time_s,
                instants = report.instants.len(),
                dispatched = report.dispatched,
                skipped = report.skipped.len(),
                "run completed"
            ),
            Err(err) => warn!(%err, "run aborted"),
        }
        result
    }

    fn execute<E>(&self, end_time_s: f64, engine: &mut E) -> Result<RunReport, SchedulerError>
    where
        E: SimulationEngine + ?Sized,
    {
        let mut report = RunReport::new(end_time_s);
        let instants = self.queue.instants();
        info!(
            end_time_s,
            events = self.queue.len(),
            instants = instants.len(),
            "run started"
        );

        for instant in &instants {
            if instant.time_s > end_time_s {
                for entry in &instant.entries {
                    warn!(%entry, end_time_s, "event after end of run, not applied");
                    report.not_reached.push((*entry).clone());
                }
                continue;
            }

            engine.advance_to(instant.time_s)?;
            report.advances += 1;
            for entry in &instant.entries {
                dispatch(entry, engine, &mut report)?;
            }
            report.instants.push(instant.time_s);
        }

        // the last batch always gets a solved interval, even at end_time_s
        engine.advance_to(end_time_s)?;
        report.advances += 1;
        Ok(report)
    }
}

/// Applies one entry to the engine.
fn dispatch<E>(entry: &QueueEntry, engine: &mut E, report: &mut RunReport) -> Result<(), SchedulerError>
where
    E: SimulationEngine + ?Sized,
{
    let event = match entry {
        QueueEntry::Event(event) => event,
        QueueEntry::Unrecognised { time_s, kind, .. } => {
            let reason = SchedulerError::UnknownEventKind {
                kind: kind.clone(),
                time_s: *time_s,
            };
            warn!(%reason, "skipping event");
            report.skipped.push(SkippedEntry {
                entry: entry.clone(),
                reason,
            });
            return Ok(());
        }
    };

    debug!(%event, "applying");
    match &event.kind {
        EventKind::BranchTrip { to_bus, circuit } => {
            let (from, to) = ordered(event.bus, *to_bus);
            engine.trip_branch(from, to, circuit)?;
        }
        EventKind::BusTrip => engine.trip_bus(event.bus)?,
        EventKind::LoadStep { step_mw } => {
            let ids = engine.load_ids(event.bus)?;
            if ids.is_empty() {
                let reason = SchedulerError::NoLoadsAtBus {
                    bus: event.bus,
                    time_s: event.time_s,
                };
                warn!(%reason, "skipping event");
                report.skipped.push(SkippedEntry {
                    entry: entry.clone(),
                    reason,
                });
                return Ok(());
            }
            let share = step_mw / ids.len() as f64;
            for id in &ids {
                let present = engine.load_value(event.bus, id)?;
                engine.set_load_value(event.bus, id, present + share)?;
            }
        }
    }
    report.dispatched += 1;
    Ok(())
}

/// Branch endpoints with the lower bus number first.
fn ordered(a: BusId, b: BusId) -> (BusId, BusId) {
    (a.min(b), a.max(b))
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}
