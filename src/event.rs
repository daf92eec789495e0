//! The global event queue of the asynchronous execution model.

use crate::node::NodeId;
use crate::packet::PacketHandle;
use crate::time::SimTime;
use crate::timer::{GlobalTimer, Timer};
use fxhash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{self, Debug, Display};

///
/// The identifier of a scheduled event, used for explicit revocation.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub(crate) u64);

impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// A time-stamped unit of global work.
///
pub(crate) enum Event {
    /// A packet reaches its destination.
    Delivery { packet: PacketHandle },
    /// A per-node timer fires.
    NodeTimer {
        node: NodeId,
        timer_id: u64,
        timer: Box<dyn Timer>,
    },
    /// A global timer fires.
    GlobalTimer {
        timer_id: u64,
        timer: Box<dyn GlobalTimer>,
    },
}

impl Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery { packet } => write!(f, "Delivery({packet:?})"),
            Self::NodeTimer { node, .. } => write!(f, "NodeTimer({node})"),
            Self::GlobalTimer { .. } => write!(f, "GlobalTimer"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventNode {
    pub(crate) time: SimTime,
    pub(crate) id: EventId,
    pub(crate) seq: u64,
    pub(crate) owner: Option<NodeId>,
    pub(crate) event: Event,
}

// The heap is a max-heap, so the ordering is reversed; ties on identical
// timestamps resolve in insertion order via the sequence number.
impl Ord for EventNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for EventNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventNode {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for EventNode {}

///
/// The global time-ordered queue of pending events.
///
/// [`get_next_event`](EventQueue::get_next_event) yields events in
/// non-decreasing time order; two events with identical timestamps come out
/// in the order they were inserted. Scheduling an event strictly before the
/// time of the last popped event panics: the clock only moves forward.
///
/// Revocation ([`drop_event`], node removal) tombstones entries; tombstoned
/// entries are filtered lazily on pop.
///
/// [`drop_event`]: EventQueue::drop_event
///
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<EventNode>,
    dropped: FxHashSet<u64>,
    next_id: u64,
    next_seq: u64,
    last_popped: SimTime,
}

impl EventQueue {
    /// Returns the number of pending (non-revoked) events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len() - self.dropped.len()
    }

    /// Indicates whether no pending events exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///
    /// Schedules `event` at `time` for the given owner node (`None` for
    /// global work).
    ///
    /// # Panics
    ///
    /// Panics when scheduling strictly before the current queue time.
    ///
    pub(crate) fn insert(
        &mut self,
        time: SimTime,
        owner: Option<NodeId>,
        event: Event,
    ) -> EventId {
        assert!(
            time >= self.last_popped,
            "cannot schedule an event at {time}, the queue already reached {}",
            self.last_popped
        );
        let id = EventId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(EventNode {
            time,
            id,
            seq,
            owner,
            event,
        });
        id
    }

    ///
    /// Pops the earliest pending event, `None` if the queue is exhausted.
    ///
    pub(crate) fn get_next_event(&mut self) -> Option<EventNode> {
        while let Some(node) = self.heap.pop() {
            if self.dropped.remove(&node.id.0) {
                continue;
            }
            self.last_popped = node.time;
            return Some(node);
        }
        None
    }

    /// Puts a popped event back unhandled (used when a run limit strikes).
    pub(crate) fn requeue(&mut self, node: EventNode) {
        self.heap.push(node);
    }

    ///
    /// Revokes a single pending event. Returns whether the event was still
    /// pending.
    ///
    pub(crate) fn drop_event(&mut self, id: EventId) -> bool {
        if self.heap.iter().any(|n| n.id == id) && self.dropped.insert(id.0) {
            return true;
        }
        false
    }

    ///
    /// Removes every pending event owned by `node`, returning the removed
    /// events so the caller can release resources they reference (delivery
    /// events hold packet handles).
    ///
    pub(crate) fn remove_all_events_for_node(&mut self, node: NodeId) -> Vec<EventNode> {
        let mut removed = Vec::new();
        let mut kept = BinaryHeap::with_capacity(self.heap.len());
        for entry in std::mem::take(&mut self.heap) {
            if self.dropped.remove(&entry.id.0) {
                continue;
            }
            if entry.owner == Some(node) {
                removed.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.heap = kept;
        removed
    }
}
