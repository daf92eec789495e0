//! The timer subsystem.

use crate::node::Api;
use crate::time::SimTime;
use crate::world::World;
use std::fmt::{self, Debug};

///
/// A unit of deferred per-node work.
///
/// Scheduled through [`Api::set_timer`](crate::node::Api::set_timer), a
/// timer fires once at its fire time and is consumed; recurring behavior is
/// expressed by scheduling a fresh timer from inside
/// [`fire`](Timer::fire).
///
/// In synchronous mode timers live in the owning node's collection and fire
/// during the node's step; in asynchronous mode a timer is represented as an
/// event in the global queue.
///
pub trait Timer: 'static {
    /// Performs the deferred work on the owning node.
    fn fire(self: Box<Self>, api: &mut Api<'_>);
}

///
/// A unit of deferred global work, bound to the simulation rather than a
/// node. Fired by the drivers' global-timer phase.
///
pub trait GlobalTimer: 'static {
    /// Performs the deferred work.
    fn fire(self: Box<Self>, world: &mut World);
}

///
/// A cancellation token for a scheduled timer.
///
/// Cancelling is cheap: the entry stays in place and is skipped when due,
/// instead of being surgically removed from the collection.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

pub(crate) struct TimerEntry<T> {
    pub(crate) id: u64,
    pub(crate) fire_time: SimTime,
    pub(crate) seq: u64,
    pub(crate) active: bool,
    pub(crate) timer: T,
}

///
/// A collection of pending timers, generic over the unit of work
/// (per-node [`Timer`]s or [`GlobalTimer`]s).
///
pub struct TimerCollection<T> {
    entries: Vec<TimerEntry<T>>,
    seq: u64,
}

impl<T> TimerCollection<T> {
    /// Returns the number of pending (non-cancelled) timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    /// Indicates whether no pending timers exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn schedule(&mut self, id: u64, fire_time: SimTime, timer: T) -> TimerHandle {
        let seq = self.seq;
        self.seq += 1;
        self.entries.push(TimerEntry {
            id,
            fire_time,
            seq,
            active: true,
            timer,
        });
        TimerHandle(id)
    }

    /// Deactivates the timer behind `handle`. Returns whether a pending
    /// timer was cancelled.
    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> bool {
        for entry in &mut self.entries {
            if entry.id == handle.0 && entry.active {
                entry.active = false;
                return true;
            }
        }
        false
    }

    ///
    /// Extracts every due, non-cancelled timer into a scratch list sorted by
    /// exact fire time (ties: scheduling order). Firing must happen on the
    /// returned list, never while iterating the live collection, because a
    /// fire callback may schedule new timers on the same collection.
    ///
    pub(crate) fn drain_due(&mut self, now: SimTime) -> Vec<TimerEntry<T>> {
        let mut due = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if !entry.active {
                continue;
            }
            if entry.fire_time <= now {
                due.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        due.sort_by_key(|e| (e.fire_time, e.seq));
        due
    }
}

impl<T> Default for TimerCollection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }
}

impl<T> Debug for TimerCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerCollection")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_due_sorts_and_keeps_future_entries() {
        let mut timers: TimerCollection<u32> = TimerCollection::default();
        timers.schedule(0, SimTime::from(5.0), 50);
        timers.schedule(1, SimTime::from(2.0), 20);
        timers.schedule(2, SimTime::from(2.0), 21);
        timers.schedule(3, SimTime::from(9.0), 90);

        let due = timers.drain_due(SimTime::from(5.0));
        let values: Vec<u32> = due.iter().map(|e| e.timer).collect();
        // Fire time first, scheduling order on ties.
        assert_eq!(values, vec![20, 21, 50]);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn cancelled_timers_do_not_fire() {
        let mut timers: TimerCollection<u32> = TimerCollection::default();
        let keep = timers.schedule(0, SimTime::from(1.0), 1);
        let gone = timers.schedule(1, SimTime::from(1.0), 2);

        assert!(timers.cancel(gone));
        assert!(!timers.cancel(gone));
        assert_eq!(timers.len(), 1);

        let due = timers.drain_due(SimTime::from(1.0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, keep.0);
    }
}
