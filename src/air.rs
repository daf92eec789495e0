//! Tracking of concurrently airborne packets.

use crate::packet::PacketHandle;

///
/// The registry of packets currently in the air.
///
/// Only populated when interference modeling is enabled. A unicast packet
/// enters on send and leaves when its arrival is processed. A broadcast
/// burst is represented by a single *active* packet (the copy with the
/// latest arrival time, covering the burst's whole airtime); the remaining
/// *passive* copies share its bookkeeping so one burst never counts as many
/// independent transmissions.
///
/// The buffer does set bookkeeping only; whether overlapping transmissions
/// actually disturb a packet is decided by the receiver's
/// [`InterferenceModel`](crate::models::InterferenceModel).
///
#[derive(Debug, Default)]
pub struct AirBuffer {
    airborne: Vec<PacketHandle>,
}

impl AirBuffer {
    /// Returns the number of tracked transmissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.airborne.len()
    }

    /// Indicates whether nothing is in the air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airborne.is_empty()
    }

    /// Iterates over the tracked packet handles.
    pub fn iter(&self) -> impl Iterator<Item = PacketHandle> + '_ {
        self.airborne.iter().copied()
    }

    pub(crate) fn insert(&mut self, handle: PacketHandle) {
        debug_assert!(!self.airborne.contains(&handle));
        self.airborne.push(handle);
    }

    pub(crate) fn remove(&mut self, handle: PacketHandle) -> bool {
        if let Some(pos) = self.airborne.iter().position(|&h| h == handle) {
            self.airborne.swap_remove(pos);
            true
        } else {
            false
        }
    }
}
