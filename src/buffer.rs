//! Per-node packet buffering and delivery-result reporting.

use crate::packet::{Packet, PacketHandle};
use crate::util::Arena;

///
/// The arrival buffer of a node.
///
/// Holds every packet currently in flight towards the node plus the packets
/// that completed delivery and wait to be read by the node's next step. The
/// buffer scan itself ([`update_message_buffer`]) lives on the world, since
/// a failed delivery is reported to the *sender's* nack box.
///
/// [`update_message_buffer`]: crate::world::World::update_message_buffer
///
#[derive(Debug, Default)]
pub struct PacketBuffer {
    pub(crate) in_flight: Vec<PacketHandle>,
    pub(crate) arrived: Vec<PacketHandle>,
}

impl PacketBuffer {
    /// Returns the number of packets still traveling towards the node.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the number of packets delivered and not yet read.
    #[must_use]
    pub fn arrived(&self) -> usize {
        self.arrived.len()
    }
}

///
/// The read view over the packets a node receives in one step.
///
/// Handed to [`Node::handle_messages`](crate::node::Node::handle_messages)
/// (and, wrapping nack packets, to `handle_nack_messages`). Packets are
/// sorted by arrival time, ties broken by the packets' stable sequence
/// numbers. The packets behind the handles are freed by the driver once the
/// step completes; handles must not be stored beyond the step.
///
#[derive(Debug, Default)]
pub struct Inbox {
    handles: Vec<PacketHandle>,
}

impl Inbox {
    pub(crate) fn new(mut handles: Vec<PacketHandle>, packets: &Arena<Packet>) -> Self {
        handles.sort_by_key(|&h| {
            let pkt = packets.get(h).expect("inbox packet already freed");
            (pkt.arriving_time, pkt.seq)
        });
        Self { handles }
    }

    /// Returns the number of packets in this inbox.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Indicates whether the inbox holds no packets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates over the packet handles in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = PacketHandle> + '_ {
        self.handles.iter().copied()
    }

    pub(crate) fn handles(&self) -> &[PacketHandle] {
        &self.handles
    }
}

///
/// The negative-acknowledgement buffers of a node.
///
/// Two buffers keyed by round parity: a drop recorded while round K is
/// processed lands in the buffer that round K+1 reads, so the sender learns
/// of the loss exactly one round after the packet should have arrived.
///
#[derive(Debug, Default)]
pub struct NackBox {
    bufs: [Vec<PacketHandle>; 2],
}

impl NackBox {
    /// Returns the number of drop reports waiting on the given parity.
    #[must_use]
    pub fn len(&self, parity: usize) -> usize {
        self.bufs[parity & 1].len()
    }

    pub(crate) fn push(&mut self, parity: usize, handle: PacketHandle) {
        self.bufs[parity & 1].push(handle);
    }

    pub(crate) fn take(&mut self, parity: usize) -> Vec<PacketHandle> {
        std::mem::take(&mut self.bufs[parity & 1])
    }

    pub(crate) fn drain_all(&mut self) -> Vec<PacketHandle> {
        let mut all = std::mem::take(&mut self.bufs[0]);
        all.append(&mut self.bufs[1]);
        all
    }
}
