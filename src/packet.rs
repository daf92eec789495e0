//! In-flight message envelopes.

use crate::edge::EdgeHandle;
use crate::message::Message;
use crate::node::NodeId;
use crate::time::SimTime;
use crate::util::Handle;

/// A handle to a [`Packet`] stored in the packet arena.
pub type PacketHandle = Handle<Packet>;

///
/// The transmission class of a packet.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// A packet addressed to a single destination.
    Unicast,
    /// One packet of a broadcast burst (one copy per outgoing edge).
    Multicast,
    ///
    /// A placeholder packet emitted by an isolated broadcaster under
    /// interference modeling. Never deliverable, never nacked; exists only
    /// to keep the airborne bookkeeping consistent.
    ///
    Dummy,
}

///
/// An envelope transporting a cloned [`Message`] between two nodes.
///
/// Packets live in the world's packet arena and are freed exactly once,
/// after the receiving node's step has read them (or immediately, when the
/// delivery failed and no negative acknowledgement is owed).
///
#[derive(Debug)]
pub struct Packet {
    pub(crate) message: Box<dyn Message>,
    pub(crate) origin: NodeId,
    pub(crate) destination: NodeId,
    pub(crate) edge: Option<EdgeHandle>,
    pub(crate) sending_time: SimTime,
    pub(crate) arriving_time: SimTime,
    pub(crate) intensity: f64,
    pub(crate) positive_delivery: bool,
    pub(crate) kind: PacketKind,
    pub(crate) seq: u64,
    pub(crate) active: bool,
}

impl Packet {
    /// Returns the transported message.
    #[must_use]
    pub fn message(&self) -> &dyn Message {
        &*self.message
    }

    /// Returns the message casted to type `T`, `None` on a type mismatch.
    #[must_use]
    pub fn message_as<T: Message>(&self) -> Option<&T> {
        self.message().downcast_ref::<T>()
    }

    /// Returns the sending node.
    #[must_use]
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Returns the receiving node.
    #[must_use]
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Returns the edge the packet travels on, if any (`send_direct`
    /// bypasses edges).
    #[must_use]
    pub fn edge(&self) -> Option<EdgeHandle> {
        self.edge
    }

    /// Returns the time the packet left its sender.
    #[must_use]
    pub fn sending_time(&self) -> SimTime {
        self.sending_time
    }

    /// Returns the time the packet reaches its destination. Never earlier
    /// than [`sending_time`](Packet::sending_time).
    #[must_use]
    pub fn arriving_time(&self) -> SimTime {
        self.arriving_time
    }

    /// Returns the sending intensity the packet was transmitted with.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    ///
    /// Indicates whether the packet will reach (or has reached) its
    /// destination. Cleared by the reliability model at send time, by
    /// interference, or by its edge disappearing mid-flight.
    ///
    #[must_use]
    pub fn positive_delivery(&self) -> bool {
        self.positive_delivery
    }

    /// Returns the transmission class.
    #[must_use]
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    ///
    /// Returns the monotonic sequence number of this packet, the stable
    /// secondary sort key of the [`Inbox`](crate::buffer::Inbox).
    ///
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
