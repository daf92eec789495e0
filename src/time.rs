//!
//! Temporal quantification in a simulation context.
//!
//! [`SimTime`] is a point on the simulation clock, measured in seconds since
//! the start of the run. The clock is owned by the
//! [`World`](crate::world::World) and only ever moves forward: the
//! synchronous driver advances it by `1.0` per round, the asynchronous
//! driver jumps it to the timestamp of each handled event.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Sub};

///
/// A specific point of time in the simulation.
///
/// Internally a count of seconds since simulation start. Ordering is total
/// (`f64::total_cmp`), so `SimTime` can key time-ordered collections.
///
#[derive(Copy, Clone, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0.0);
    /// The smallest valid instance of a [`SimTime`].
    pub const MIN: SimTime = SimTime(0.0);
    /// The greatest instance of a [`SimTime`].
    pub const MAX: SimTime = SimTime(f64::INFINITY);

    ///
    /// Creates a new instance from a count of seconds since simulation
    /// start.
    ///
    /// # Panics
    ///
    /// Panics if the given value is negative or NaN.
    ///
    #[must_use]
    pub fn new(secs: f64) -> Self {
        assert!(
            secs >= 0.0,
            "SimTime must be a non-negative number of seconds (got {secs})"
        );
        Self(secs)
    }

    /// Returns the time as a count of seconds since simulation start.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Returns the amount of time elapsed from `earlier` to this instant,
    /// or zero if `earlier` is later than this instant.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: f64) -> Self::Output {
        let next = self.0 + rhs;
        assert!(
            next >= self.0,
            "SimTime arithmetic must not move backwards (adding {rhs})"
        );
        SimTime(next)
    }
}

impl AddAssign<f64> for SimTime {
    fn add_assign(&mut self, rhs: f64) {
        *self = *self + rhs;
    }
}

impl Sub<SimTime> for SimTime {
    type Output = f64;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(this: SimTime) -> Self {
        this.0
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}
