//! Run limits for bounding a simulation.

use crate::time::SimTime;
use std::fmt::{self, Display};

///
/// A bound on how long a simulation runs.
///
/// Limits compose: [`and`](RuntimeLimit::and) strikes once both halves
/// strike, [`or`](RuntimeLimit::or) once either does. An unlimited run only
/// ends through scenario termination, queue exhaustion or an abort.
///
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeLimit {
    /// No limit.
    None,
    /// Stop after the given number of handled events (asynchronous mode).
    EventCount(usize),
    /// Stop after the given number of completed rounds (synchronous mode).
    Rounds(u64),
    /// Stop once the clock reaches the given simulation time.
    SimTime(SimTime),
    /// Stop once both inner limits strike.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),
    /// Stop once either inner limit strikes.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    pub(crate) fn applies(&self, rounds: u64, events: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,
            Self::EventCount(n) => events >= *n,
            Self::Rounds(n) => rounds >= *n,
            Self::SimTime(t) => time >= *t,
            Self::CombinedAnd(a, b) => {
                a.applies(rounds, events, time) && b.applies(rounds, events, time)
            }
            Self::CombinedOr(a, b) => {
                a.applies(rounds, events, time) || b.applies(rounds, events, time)
            }
        }
    }

    /// Combines two limits, striking once either does.
    #[must_use]
    pub fn or(self, other: RuntimeLimit) -> Self {
        match (self, other) {
            (Self::None, other) => other,
            (s, Self::None) => s,
            (s, other) => Self::CombinedOr(Box::new(s), Box::new(other)),
        }
    }

    /// Combines two limits, striking once both do.
    #[must_use]
    pub fn and(self, other: RuntimeLimit) -> Self {
        match (self, other) {
            (Self::None, other) => other,
            (s, Self::None) => s,
            (s, other) => Self::CombinedAnd(Box::new(s), Box::new(other)),
        }
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::EventCount(n) => write!(f, "{n} events"),
            Self::Rounds(n) => write!(f, "{n} rounds"),
            Self::SimTime(t) => write!(f, "t = {t}"),
            Self::CombinedAnd(a, b) => write!(f, "({a} and {b})"),
            Self::CombinedOr(a, b) => write!(f, "({a} or {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_limits() {
        assert!(!RuntimeLimit::None.applies(u64::MAX, usize::MAX, SimTime::MAX));
        assert!(RuntimeLimit::Rounds(10).applies(10, 0, SimTime::ZERO));
        assert!(!RuntimeLimit::Rounds(10).applies(9, 0, SimTime::ZERO));
        assert!(RuntimeLimit::EventCount(3).applies(0, 3, SimTime::ZERO));
        assert!(RuntimeLimit::SimTime(5.0.into()).applies(0, 0, 5.0.into()));
        assert!(!RuntimeLimit::SimTime(5.0.into()).applies(0, 0, 4.9.into()));
    }

    #[test]
    fn combined_limits() {
        let and = RuntimeLimit::Rounds(10).and(RuntimeLimit::EventCount(5));
        assert!(!and.applies(10, 4, SimTime::ZERO));
        assert!(!and.applies(9, 5, SimTime::ZERO));
        assert!(and.applies(10, 5, SimTime::ZERO));

        let or = RuntimeLimit::Rounds(10).or(RuntimeLimit::EventCount(5));
        assert!(or.applies(10, 0, SimTime::ZERO));
        assert!(or.applies(0, 5, SimTime::ZERO));
        assert!(!or.applies(9, 4, SimTime::ZERO));
    }

    #[test]
    fn none_is_the_neutral_element() {
        assert_eq!(
            RuntimeLimit::None.or(RuntimeLimit::Rounds(3)),
            RuntimeLimit::Rounds(3)
        );
        assert_eq!(
            RuntimeLimit::Rounds(3).and(RuntimeLimit::None),
            RuntimeLimit::Rounds(3)
        );
    }
}
