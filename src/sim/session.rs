//! Setup and run sequencing around one engine.

use tracing::{debug, info, warn};

use super::allocator::{AllocationPlan, CapacityAllocator, TransferRequest};
use super::event::{Event, EventSpec};
use super::scheduler::{EventScheduler, RunReport};
use crate::engine::{ChannelRequest, ChannelTable, DynamicsParams, SimulationEngine};
use crate::error::{AllocError, SessionError};
use crate::model::BusId;

/// Owns an engine and sequences allocation, setup, and the dynamic run.
pub struct SimulationSession<E: SimulationEngine> {
    engine: E,
    allocator: CapacityAllocator,
    accept_partial: bool,
    scheduler: EventScheduler,
}

impl<E: SimulationEngine> SimulationSession<E> {
    /// Creates a session with a zero-tolerance allocator that rejects
    /// partial plans.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            allocator: CapacityAllocator::default(),
            accept_partial: false,
            scheduler: EventScheduler::new(),
        }
    }

    /// Replaces the allocator and the partial-plan policy.
    pub fn with_allocator(mut self, allocator: CapacityAllocator, accept_partial: bool) -> Self {
        self.allocator = allocator;
        self.accept_partial = accept_partial;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    /// Moves the transfer carried by the first load at `bus` to `target_mw`
    /// and redistributes the change over the generator fleet.
    ///
    /// The plan is computed before anything is written, so an allocation
    /// failure leaves the engine untouched.
    ///
    /// # Errors
    ///
    /// * [`SessionError::InvalidTransfer`] if `target_mw` is not finite
    /// * [`SessionError::NoTransferLoad`] if `bus` has no load record
    /// * [`SessionError::Alloc`] if allocation fails; a capacity shortfall is
    ///   only an error when partial plans are not accepted
    /// * [`SessionError::Engine`] for any failing engine call
    pub fn set_transfer(&mut self, bus: BusId, target_mw: f64) -> Result<AllocationPlan, SessionError> {
        if !target_mw.is_finite() {
            return Err(SessionError::InvalidTransfer { bus, target_mw });
        }
        let load_id = self
            .engine
            .load_ids(bus)?
            .into_iter()
            .next()
            .ok_or(SessionError::NoTransferLoad(bus))?;
        let present_mw = self.engine.load_value(bus, &load_id)?;
        let delta_mw = target_mw - present_mw;
        let area = self.engine.bus_area(bus)?;
        let fleet = self.engine.generators()?;

        let request = TransferRequest::new(area, delta_mw);
        let plan = match self.allocator.allocate(&fleet, &request) {
            Ok(plan) => plan,
            Err(AllocError::CapacityExceeded { shortfall_mw, plan }) if self.accept_partial => {
                warn!(%bus, shortfall_mw, "applying partial allocation plan");
                *plan
            }
            Err(err) => return Err(err.into()),
        };

        self.engine.set_load_value(bus, &load_id, target_mw)?;
        for adjustment in plan.changed() {
            debug!(id = %adjustment.id, to_mw = adjustment.to_mw, "dispatch");
            self.engine
                .set_generator_output(&adjustment.id, adjustment.to_mw)?;
        }
        info!(
            %bus,
            %area,
            from_mw = present_mw,
            to_mw = target_mw,
            realized_mw = plan.realized_mw,
            "transfer changed"
        );
        Ok(plan)
    }

    /// Total output of the in-service machines at `bus` (MW).
    pub fn generation_at_bus(&self, bus: BusId) -> Result<f64, SessionError> {
        Ok(self
            .engine
            .generators()?
            .iter()
            .filter(|g| g.id.bus == bus)
            .map(|g| g.p_mw)
            .sum())
    }

    /// Registers channels, solves the static case, and initializes dynamics.
    pub fn prepare(
        &mut self,
        channels: &[ChannelRequest],
        params: &DynamicsParams,
    ) -> Result<(), SessionError> {
        for request in channels {
            self.engine.monitor(request.clone())?;
        }
        self.engine.solve_power_flow()?;
        self.engine.initialize_dynamics(params)?;
        info!(channels = channels.len(), time_step_s = params.time_step_s, "dynamics initialized");
        Ok(())
    }

    pub fn add_event(&mut self, event: Event) -> Result<(), SessionError> {
        Ok(self.scheduler.register(event)?)
    }

    pub fn add_event_spec(&mut self, spec: EventSpec) -> Result<(), SessionError> {
        Ok(self.scheduler.register_spec(spec)?)
    }

    /// Runs the registered events through the engine up to `end_time_s`.
    pub fn run(&mut self, end_time_s: f64) -> Result<RunReport, SessionError> {
        Ok(self.scheduler.run(end_time_s, &mut self.engine)?)
    }

    /// Clears the registered events so another run can be scheduled.
    pub fn reset_events(&mut self) {
        self.scheduler.reset();
    }

    pub fn channels(&self) -> Result<ChannelTable, SessionError> {
        Ok(self.engine.read_channels()?)
    }
}
