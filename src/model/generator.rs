use serde::{Deserialize, Serialize};

use super::types::{AreaId, GeneratorId};

/// Direction of a requested output change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Output increases toward the machine maximum.
    Raise,
    /// Output decreases toward zero.
    Lower,
}

impl Direction {
    /// Direction implied by a signed delta; `None` for zero.
    pub fn of(delta_mw: f64) -> Option<Self> {
        if delta_mw > 0.0 {
            Some(Self::Raise)
        } else if delta_mw < 0.0 {
            Some(Self::Lower)
        } else {
            None
        }
    }

    /// `+1.0` for raise, `-1.0` for lower.
    pub fn sign(self) -> f64 {
        match self {
            Self::Raise => 1.0,
            Self::Lower => -1.0,
        }
    }
}

/// Operating point of one machine as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Present active power output (MW).
    pub p_mw: f64,
    /// Maximum active power output (MW).
    pub p_max_mw: f64,
}

/// A dispatchable machine with its area membership.
///
/// Output convention: `0 <= p_mw <= p_max_mw` for a valid operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Machine identity.
    pub id: GeneratorId,
    /// Area the machine's bus belongs to.
    pub area: AreaId,
    /// Present active power output (MW).
    pub p_mw: f64,
    /// Maximum active power output (MW).
    pub p_max_mw: f64,
}

impl Generator {
    /// Creates a generator record.
    pub fn new(id: GeneratorId, area: AreaId, p_mw: f64, p_max_mw: f64) -> Self {
        Self {
            id,
            area,
            p_mw,
            p_max_mw,
        }
    }

    /// Room left to move in `direction` before hitting a bound.
    ///
    /// Raising is bounded by `p_max_mw`, lowering by zero output.
    pub fn headroom_mw(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Raise => self.p_max_mw - self.p_mw,
            Direction::Lower => self.p_mw,
        }
    }

    /// Output the machine reaches when saturated in `direction`.
    pub fn bound_mw(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Raise => self.p_max_mw,
            Direction::Lower => 0.0,
        }
    }

    /// Returns `true` when the operating point is finite and within `[0, p_max]`.
    pub fn is_valid(&self) -> bool {
        self.p_mw.is_finite()
            && self.p_max_mw.is_finite()
            && self.p_mw >= 0.0
            && self.p_mw <= self.p_max_mw
    }
}
