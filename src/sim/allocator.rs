//! Two-tier generation redistribution.
//!
//! A transfer change at one location is absorbed by the machines of the
//! location's area first. Only when the area cannot take all of it are the
//! area's machines driven to their bounds and the residual spread over the
//! rest of the system. An area without machines of its own (an HVDC
//! terminal, say) passes the whole change to the rest. Within each tier the share of a machine is
//! proportional to its headroom in the direction of the change.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AllocError, AllocResult};
use crate::model::{AreaId, Direction, Generator, GeneratorId};

/// A signed change in net injection to be absorbed by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferRequest {
    /// Area of the location where the transfer changes.
    pub area: AreaId,
    /// Positive raises generation, negative lowers it (MW).
    pub delta_mw: f64,
}

impl TransferRequest {
    pub fn new(area: AreaId, delta_mw: f64) -> Self {
        Self { area, delta_mw }
    }
}

/// New target output for one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjustment {
    pub id: GeneratorId,
    pub area: AreaId,
    /// Output before the plan is applied (MW).
    pub from_mw: f64,
    /// Output after the plan is applied (MW).
    pub to_mw: f64,
}

impl Adjustment {
    /// Signed change for this machine (MW).
    pub fn change_mw(&self) -> f64 {
        self.to_mw - self.from_mw
    }
}

/// Result of an allocation: one adjustment per fleet member, in fleet order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub area: AreaId,
    /// Delta that was asked for (MW).
    pub requested_mw: f64,
    /// Sum of all adjustments (MW).
    pub realized_mw: f64,
    /// Part of the request that could not be placed (MW, non-negative).
    pub shortfall_mw: f64,
    pub adjustments: Vec<Adjustment>,
}

impl AllocationPlan {
    /// Plan that leaves every machine where it is.
    fn identity(generators: &[Generator], request: &TransferRequest) -> Self {
        Self {
            area: request.area,
            requested_mw: request.delta_mw,
            realized_mw: 0.0,
            shortfall_mw: 0.0,
            adjustments: generators
                .iter()
                .map(|g| Adjustment {
                    id: g.id.clone(),
                    area: g.area,
                    from_mw: g.p_mw,
                    to_mw: g.p_mw,
                })
                .collect(),
        }
    }

    /// Target output of `id`, if it is part of the plan.
    pub fn target_mw(&self, id: &GeneratorId) -> Option<f64> {
        self.adjustments
            .iter()
            .find(|a| &a.id == id)
            .map(|a| a.to_mw)
    }

    /// Adjustments that actually move a machine.
    pub fn changed(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustments.iter().filter(|a| a.to_mw != a.from_mw)
    }

    /// Returns `true` when the full request was placed.
    pub fn is_complete(&self) -> bool {
        self.shortfall_mw == 0.0
    }
}

impl fmt::Display for AllocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Allocation Plan (area {}) ---", self.area)?;
        writeln!(f, "Requested:  {:>10.3} MW", self.requested_mw)?;
        writeln!(f, "Realized:   {:>10.3} MW", self.realized_mw)?;
        writeln!(f, "Shortfall:  {:>10.3} MW", self.shortfall_mw)?;
        for a in &self.adjustments {
            writeln!(
                f,
                "  {:<12} area {:<4} {:>10.3} -> {:>10.3} MW ({:+.3})",
                a.id.to_string(),
                a.area.to_string(),
                a.from_mw,
                a.to_mw,
                a.change_mw()
            )?;
        }
        Ok(())
    }
}

/// Computes local-first, system-spill redistribution plans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityAllocator {
    /// Shortfall tolerated before the plan is reported as insufficient (MW).
    pub tolerance_mw: f64,
}

impl CapacityAllocator {
    pub fn new(tolerance_mw: f64) -> Self {
        Self { tolerance_mw }
    }

    /// Computes the new output of every machine in `generators` so that the
    /// fleet absorbs `request.delta_mw`.
    ///
    /// # Arguments
    ///
    /// * `generators` - Fleet snapshot; order is preserved in the plan
    /// * `request` - Target area and signed delta
    ///
    /// # Errors
    ///
    /// * [`AllocError::EmptyFleet`] if `generators` is empty
    /// * [`AllocError::InvalidGeneratorState`] if any machine is outside `[0, max]`
    /// * [`AllocError::InvalidRequest`] if `request.delta_mw` is not finite
    /// * [`AllocError::CapacityExceeded`] if the whole fleet saturates before
    ///   the delta is placed; the error carries the best achievable plan
    pub fn allocate(
        &self,
        generators: &[Generator],
        request: &TransferRequest,
    ) -> AllocResult<AllocationPlan> {
        if generators.is_empty() {
            return Err(AllocError::EmptyFleet);
        }
        if let Some(bad) = generators.iter().find(|g| !g.is_valid()) {
            return Err(AllocError::InvalidGeneratorState {
                id: bad.id.clone(),
                p_mw: bad.p_mw,
                p_max_mw: bad.p_max_mw,
            });
        }
        if !request.delta_mw.is_finite() {
            return Err(AllocError::InvalidRequest {
                delta_mw: request.delta_mw,
            });
        }

        let mut plan = AllocationPlan::identity(generators, request);
        let Some(direction) = Direction::of(request.delta_mw) else {
            return Ok(plan);
        };
        let magnitude = request.delta_mw.abs();

        let (local, rest): (Vec<usize>, Vec<usize>) =
            (0..generators.len()).partition(|&i| generators[i].area == request.area);
        let headroom: Vec<f64> = generators
            .iter()
            .map(|g| g.headroom_mw(direction))
            .collect();
        let local_headroom: f64 = local.iter().map(|&i| headroom[i]).sum();

        let placed = if local_headroom > magnitude {
            debug!(area = %request.area, local_headroom, magnitude, "delta fits in area");
            spread(&mut plan, generators, &headroom, &local, magnitude, direction);
            magnitude
        } else {
            saturate(&mut plan, generators, &local, direction);
            let residual = magnitude - local_headroom;
            let rest_headroom: f64 = rest.iter().map(|&i| headroom[i]).sum();
            debug!(
                area = %request.area,
                local_headroom,
                residual,
                rest_headroom,
                "area saturated, spilling residual"
            );
            if rest_headroom > residual {
                spread(&mut plan, generators, &headroom, &rest, residual, direction);
                magnitude
            } else {
                saturate(&mut plan, generators, &rest, direction);
                local_headroom + rest_headroom
            }
        };

        plan.realized_mw = plan.adjustments.iter().map(Adjustment::change_mw).sum();
        plan.shortfall_mw = (magnitude - placed).max(0.0);

        if plan.shortfall_mw > self.tolerance_mw {
            warn!(
                area = %request.area,
                requested_mw = request.delta_mw,
                shortfall_mw = plan.shortfall_mw,
                "system capacity exceeded"
            );
            return Err(AllocError::CapacityExceeded {
                shortfall_mw: plan.shortfall_mw,
                plan: Box::new(plan),
            });
        }
        Ok(plan)
    }
}

/// Distributes `amount` over `members` in proportion to their headroom.
fn spread(
    plan: &mut AllocationPlan,
    generators: &[Generator],
    headroom: &[f64],
    members: &[usize],
    amount: f64,
    direction: Direction,
) {
    let total: f64 = members.iter().map(|&i| headroom[i]).sum();
    if total <= 0.0 || amount == 0.0 {
        return;
    }
    for &i in members {
        let g = &generators[i];
        let share = amount * headroom[i] / total;
        plan.adjustments[i].to_mw = (g.p_mw + direction.sign() * share).clamp(0.0, g.p_max_mw);
    }
}

/// Drives every member to its bound in `direction`.
fn saturate(
    plan: &mut AllocationPlan,
    generators: &[Generator],
    members: &[usize],
    direction: Direction,
) {
    for &i in members {
        plan.adjustments[i].to_mw = generators[i].bound_mw(direction);
    }
}
