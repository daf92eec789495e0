//! The complete simulation state: nodes, edges, packets and the clock.

use crate::air::AirBuffer;
use crate::buffer::Inbox;
use crate::config::{Mode, SimConfig};
use crate::edge::{Edge, EdgeHandle, EdgeId};
use crate::event::{Event, EventId, EventNode, EventQueue};
use crate::message::Message;
use crate::models::{
    ConnectivityModel, ConstantTransmission, InterferenceModel, MessageTransmissionModel,
    MobilityModel, ModelRegistry, ReliabilityModel,
};
use crate::node::{Api, Node, NodeCore, NodeId, NodeModels, NodeSlot};
use crate::packet::{Packet, PacketHandle, PacketKind};
use crate::position::Position;
use crate::runtime::{RequirementError, RuntimeError};
use crate::time::SimTime;
use crate::timer::{GlobalTimer, Timer, TimerCollection, TimerEntry, TimerHandle};
use crate::util::Arena;
use fxhash::FxHashMap;
use rand::RngCore;
use tracing::{debug, trace};

/// A topology change the drivers report to observers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Notification {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
}

/// The outcome of processing a packet arrival.
pub(crate) enum Arrival {
    /// The packet reached its destination and waits in its arrival buffer.
    Delivered { dest: NodeId },
    /// The packet was dropped and its origin is owed a nack. The packet
    /// stays alive until the nack has been handed over.
    Dropped { origin: NodeId },
    /// The packet was dropped with nobody to tell, or was a placeholder;
    /// it has been freed.
    Consumed,
}

///
/// The simulation world.
///
/// Owns every node (kernel state plus user behavior), the edge and packet
/// arenas, the airborne-packet registry, the global event queue and the
/// simulation clock. Drivers and the per-node [`Api`] funnel every mutation
/// through this type; nothing in the crate reaches for shared global state.
///
pub struct World {
    config: SimConfig,
    nodes: FxHashMap<NodeId, NodeSlot>,
    order: Vec<NodeId>,
    edges: Arena<Edge>,
    packets: Arena<Packet>,
    air: AirBuffer,
    queue: EventQueue,
    global_timers: TimerCollection<Box<dyn GlobalTimer>>,
    transmission: Option<Box<dyn MessageTransmissionModel>>,
    registry: ModelRegistry,
    rng: Box<dyn RngCore>,
    orphans: Vec<PacketHandle>,
    notifications: Vec<Notification>,
    timer_events: FxHashMap<u64, EventId>,
    now: SimTime,
    round: u64,
    next_node_id: u64,
    next_edge_id: u64,
    next_packet_seq: u64,
    next_timer_id: u64,
}

impl World {
    pub(crate) fn new(config: SimConfig, rng: Box<dyn RngCore>, registry: ModelRegistry) -> Self {
        Self {
            config,
            nodes: FxHashMap::default(),
            order: Vec::new(),
            edges: Arena::new(),
            packets: Arena::new(),
            air: AirBuffer::default(),
            queue: EventQueue::default(),
            global_timers: TimerCollection::default(),
            transmission: Some(Box::new(ConstantTransmission::default())),
            registry,
            rng,
            orphans: Vec::new(),
            notifications: Vec::new(),
            timer_events: FxHashMap::default(),
            now: SimTime::ZERO,
            round: 0,
            next_node_id: 1,
            next_edge_id: 0,
            next_packet_seq: 0,
            next_timer_id: 0,
        }
    }

    // # Clock and configuration

    /// Returns the current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Returns the number of completed rounds (zero in asynchronous mode).
    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Returns the simulation configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the simulation rng.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Returns the model registry.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Returns the model registry for registration.
    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    pub(crate) fn advance_round(&mut self) {
        self.round += 1;
        self.now = SimTime::from(self.round as f64);
    }

    pub(crate) fn set_time(&mut self, time: SimTime) {
        debug_assert!(time >= self.now, "the clock only moves forward");
        self.now = time;
    }

    /// The parity the current round reads its nacks from.
    pub(crate) fn parity(&self) -> usize {
        (self.round & 1) as usize
    }

    // # Nodes

    ///
    /// Registers a node with the given behavior, assigns its id, attaches
    /// the default models and runs the behavior's
    /// [`init`](Node::init) hook.
    ///
    /// # Errors
    ///
    /// Fails if the behavior's requirements reject the configuration.
    ///
    pub fn add_node(&mut self, behavior: Box<dyn Node>) -> Result<NodeId, RequirementError> {
        behavior.check_requirements(&self.config)?;

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            NodeSlot {
                core: NodeCore::new(id),
                behavior: Some(behavior),
                models: NodeModels::default(),
            },
        );
        self.order.push(id);
        self.notifications.push(Notification::NodeAdded(id));
        debug!("registered {id}");

        let mut behavior = self.take_behavior(id).expect("slot just inserted");
        let mut api = Api {
            world: self,
            node: id,
        };
        behavior.init(&mut api);
        self.put_behavior(id, behavior);
        Ok(id)
    }

    ///
    /// Registers a node of a type previously registered by name in the
    /// [`ModelRegistry`].
    ///
    /// # Errors
    ///
    /// Fails if no such node type is registered, or if its requirements
    /// reject the configuration.
    ///
    pub fn add_node_of_type(&mut self, name: &str) -> Result<NodeId, RuntimeError> {
        let behavior = self.registry.create_node(name)?;
        Ok(self.add_node(behavior)?)
    }

    ///
    /// Removes a node and everything that references it: its edges in both
    /// directions, its buffered and in-flight packets, its timers and its
    /// pending events. Returns whether the node existed.
    ///
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.nodes.remove(&id) else {
            return false;
        };
        self.order.retain(|&n| n != id);

        let NodeSlot { mut core, .. } = slot;
        for handle in core
            .buffer
            .in_flight
            .drain(..)
            .chain(core.buffer.arrived.drain(..))
            .chain(core.nacks.drain_all())
            .collect::<Vec<_>>()
        {
            self.free_packet(handle);
        }

        // Outgoing edges.
        for handle in core.connections.iter().collect::<Vec<_>>() {
            if let Some(edge) = self.edges.free(handle) {
                if let Some(partner) = edge.reverse.and_then(|r| self.edges.get_mut(r)) {
                    partner.reverse = None;
                }
                if let Some(end) = self.nodes.get_mut(&edge.end) {
                    end.core.neighborhood_changed = true;
                }
            }
        }

        // Incoming edges.
        for other in self.order.clone() {
            let slot = self.nodes.get_mut(&other).expect("node order out of sync");
            if let Some(handle) = slot.core.connections.remove(id) {
                slot.core.neighborhood_changed = true;
                if let Some(edge) = self.edges.free(handle) {
                    if let Some(partner) = edge.reverse.and_then(|r| self.edges.get_mut(r)) {
                        partner.reverse = None;
                    }
                }
            }
        }

        if self.config.mode == Mode::Asynchronous {
            for event in self.queue.remove_all_events_for_node(id) {
                match event.event {
                    Event::Delivery { packet } => self.free_packet(packet),
                    Event::NodeTimer { timer_id, .. } => {
                        self.timer_events.remove(&timer_id);
                    }
                    Event::GlobalTimer { .. } => {}
                }
            }
        }

        self.notifications.push(Notification::NodeRemoved(id));
        debug!("removed {id}");
        true
    }

    /// Returns the number of registered nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.order.len()
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over the registered node ids in registration order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Returns the kernel state of a node.
    #[must_use]
    pub fn node_core(&self, id: NodeId) -> Option<&NodeCore> {
        self.nodes.get(&id).map(|slot| &slot.core)
    }

    /// Returns a node's position.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.nodes.get(&id).map(|slot| slot.core.position)
    }

    /// Moves a node to `pos`.
    pub fn set_position(&mut self, id: NodeId, pos: Position) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.core.position = pos;
        }
    }

    /// Returns the destinations of a node's outgoing edges.
    #[must_use]
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|slot| slot.core.connections.endpoints().collect())
            .unwrap_or_default()
    }

    /// Reorders a node's outgoing edges uniformly at random.
    pub fn shuffle_neighbors(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.core.connections.random_permutation(&mut *self.rng);
        }
    }

    // # Model attachment

    /// Replaces a node's connectivity model. Returns whether the node
    /// exists.
    pub fn set_connectivity_model(&mut self, id: NodeId, model: Box<dyn ConnectivityModel>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(slot) => {
                slot.models.connectivity = Some(model);
                true
            }
            None => false,
        }
    }

    /// Replaces a node's mobility model. Returns whether the node exists.
    pub fn set_mobility_model(&mut self, id: NodeId, model: Box<dyn MobilityModel>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(slot) => {
                slot.models.mobility = Some(model);
                true
            }
            None => false,
        }
    }

    /// Replaces a node's reliability model. Returns whether the node
    /// exists.
    pub fn set_reliability_model(&mut self, id: NodeId, model: Box<dyn ReliabilityModel>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(slot) => {
                slot.models.reliability = Some(model);
                true
            }
            None => false,
        }
    }

    /// Replaces a node's interference model. Returns whether the node
    /// exists.
    pub fn set_interference_model(&mut self, id: NodeId, model: Box<dyn InterferenceModel>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(slot) => {
                slot.models.interference = Some(model);
                true
            }
            None => false,
        }
    }

    /// Replaces the global transmission-delay model.
    pub fn set_transmission_model(&mut self, model: Box<dyn MessageTransmissionModel>) {
        self.transmission = Some(model);
    }

    // # Edges

    ///
    /// Ensures an edge from `from` to `to` exists and sets its `valid`
    /// flag. Creating and re-validating share this entry point, which is
    /// what makes the revalidation protocol work: a connectivity model
    /// simply re-adds every edge it wants to keep.
    ///
    /// Returns `true` iff a new edge was created.
    ///
    /// # Panics
    ///
    /// Panics if `from` is not registered or `from == to`.
    ///
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, valid: bool) -> bool {
        assert_ne!(from, to, "self-loops are not supported");
        let slot = self.nodes.get_mut(&from).expect("unknown source node");
        if let Some(handle) = slot.core.connections.get(to) {
            let edge = self.edges.get_mut(handle).expect("edge arena out of sync");
            edge.valid = valid;
            return false;
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        let handle = self.edges.alloc(Edge {
            id,
            start: from,
            end: to,
            valid,
            reverse: None,
            traveling: 0,
        });
        self.nodes
            .get_mut(&from)
            .expect("unknown source node")
            .core
            .connections
            .insert(to, handle);

        // Pair with the opposite direction, if it exists.
        if let Some(back) = self
            .nodes
            .get(&to)
            .and_then(|slot| slot.core.connections.get(from))
        {
            self.edges.get_mut(handle).expect("just allocated").reverse = Some(back);
            self.edges.get_mut(back).expect("edge arena out of sync").reverse = Some(handle);
        }

        self.mark_neighborhood_changed(from);
        self.mark_neighborhood_changed(to);
        trace!("created edge {id} {from} -> {to}");
        true
    }

    ///
    /// Ensures edges in both directions between `a` and `b` exist and are
    /// validated, pairing them as each other's reverse.
    ///
    pub fn add_bidirectional_edge(&mut self, a: NodeId, b: NodeId, valid: bool) {
        self.add_edge(a, b, valid);
        self.add_edge(b, a, valid);
    }

    ///
    /// Deletes the edge from `from` to `to`, if one exists. Packets still
    /// traveling on it become undeliverable. Returns whether an edge was
    /// deleted.
    ///
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let Some(slot) = self.nodes.get_mut(&from) else {
            return false;
        };
        let Some(handle) = slot.core.connections.remove(to) else {
            return false;
        };
        if let Some(edge) = self.edges.free(handle) {
            if let Some(partner) = edge.reverse.and_then(|r| self.edges.get_mut(r)) {
                partner.reverse = None;
            }
            trace!("deleted edge {} {from} -> {to}", edge.id);
        }
        self.mark_neighborhood_changed(from);
        self.mark_neighborhood_changed(to);
        true
    }

    /// Returns the data of a live edge.
    #[must_use]
    pub fn edge(&self, handle: EdgeHandle) -> Option<&Edge> {
        self.edges.get(handle)
    }

    /// Returns the handle of the edge from `from` to `to`, if one exists.
    #[must_use]
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeHandle> {
        self.nodes.get(&from)?.core.connections.get(to)
    }

    fn mark_neighborhood_changed(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.core.neighborhood_changed = true;
        }
    }

    // # Packets

    /// Returns a live packet.
    #[must_use]
    pub fn packet(&self, handle: PacketHandle) -> Option<&Packet> {
        self.packets.get(handle)
    }

    /// Returns the registry of packets currently in the air.
    #[must_use]
    pub fn airborne(&self) -> &AirBuffer {
        &self.air
    }

    pub(crate) fn send_from(&mut self, sender: NodeId, msg: &dyn Message, target: NodeId) {
        let edge = self.edge_between(sender, target);
        let handle =
            self.launch(sender, msg.clone_message(), target, edge, PacketKind::Unicast, false);
        if self.config.interference {
            if let Some(handle) = handle {
                self.activate(handle);
            }
            self.test_for_interference();
        }
    }

    pub(crate) fn broadcast_from(&mut self, sender: NodeId, msg: &dyn Message) {
        let targets: Vec<(NodeId, EdgeHandle)> = self
            .nodes
            .get(&sender)
            .map(|slot| {
                slot.core
                    .connections
                    .endpoints()
                    .zip(slot.core.connections.iter())
                    .collect()
            })
            .unwrap_or_default();

        if targets.is_empty() {
            // An isolated broadcaster still occupies the medium: emit an
            // undeliverable placeholder so the airborne bookkeeping stays
            // consistent.
            if self.config.interference {
                let handle =
                    self.launch(sender, msg.clone_message(), sender, None, PacketKind::Dummy, false);
                if let Some(handle) = handle {
                    self.activate(handle);
                }
                self.test_for_interference();
            }
            return;
        }

        let mut copies = Vec::with_capacity(targets.len());
        for (target, edge) in targets {
            if let Some(handle) = self.launch(
                sender,
                msg.clone_message(),
                target,
                Some(edge),
                PacketKind::Multicast,
                false,
            ) {
                copies.push(handle);
            }
        }

        if self.config.interference {
            // One burst, one airborne transmission: the copy with the
            // latest arrival covers the whole airtime, the rest ride along
            // passively.
            let active = copies.iter().copied().max_by(|&a, &b| {
                let ta = self.packets.get(a).expect("just launched").arriving_time;
                let tb = self.packets.get(b).expect("just launched").arriving_time;
                ta.cmp(&tb)
            });
            if let Some(handle) = active {
                self.activate(handle);
            }
            self.test_for_interference();
        }
    }

    pub(crate) fn send_direct_from(&mut self, sender: NodeId, msg: &dyn Message, target: NodeId) {
        // Out-of-band: no edge, no reliability, no interference.
        self.launch(sender, msg.clone_message(), target, None, PacketKind::Unicast, true);
    }

    ///
    /// Builds a packet, runs the transmission and reliability models and
    /// routes it to the target's buffer (synchronous) or a delivery event
    /// (asynchronous). Returns the packet's handle, `None` only if the
    /// sender is not registered.
    ///
    fn launch(
        &mut self,
        origin: NodeId,
        message: Box<dyn Message>,
        target: NodeId,
        edge: Option<EdgeHandle>,
        kind: PacketKind,
        direct: bool,
    ) -> Option<PacketHandle> {
        let sender_pos = self.position(origin)?;
        let target_pos = self.position(target).unwrap_or(sender_pos);
        let intensity = self.nodes.get(&origin)?.core.intensity;

        let mut model = self.transmission.take().expect("transmission model must be set");
        let delay = model.time_to_reach(origin, target, sender_pos, target_pos, &mut *self.rng);
        self.transmission = Some(model);
        assert!(
            delay >= 0.0,
            "transmission model returned a negative delay ({delay})"
        );

        let seq = self.next_packet_seq;
        self.next_packet_seq += 1;
        // send() without an edge never arrives; send_direct() has no edge
        // on purpose and still does.
        let deliverable = kind != PacketKind::Dummy
            && self.nodes.contains_key(&target)
            && (direct || edge.is_some());
        let mut packet = Packet {
            message,
            origin,
            destination: target,
            edge,
            sending_time: self.now,
            arriving_time: self.now + delay,
            intensity,
            positive_delivery: deliverable,
            kind,
            seq,
            active: false,
        };

        if packet.positive_delivery && !direct {
            let mut reliability = self
                .nodes
                .get_mut(&origin)
                .expect("sender vanished mid-send")
                .models
                .reliability
                .take()
                .expect("reliability model missing");
            packet.positive_delivery = reliability.reaches_destination(&packet, &mut *self.rng);
            self.nodes.get_mut(&origin).expect("sender vanished mid-send").models.reliability =
                Some(reliability);
        }

        let arriving = packet.arriving_time;
        trace!(
            "{origin} -> {target}: packet {seq} leaves at {}, arrives at {arriving}",
            self.now
        );
        let handle = self.packets.alloc(packet);
        if let Some(e) = edge {
            if let Some(edge) = self.edges.get_mut(e) {
                edge.traveling += 1;
            }
        }

        match self.config.mode {
            Mode::Synchronous => {
                if let Some(slot) = self.nodes.get_mut(&target) {
                    slot.core.buffer.in_flight.push(handle);
                } else {
                    self.orphans.push(handle);
                }
            }
            Mode::Asynchronous => {
                let owner = self.nodes.contains_key(&target).then_some(target);
                self.queue
                    .insert(arriving, owner, Event::Delivery { packet: handle });
            }
        }
        Some(handle)
    }

    fn activate(&mut self, handle: PacketHandle) {
        if let Some(packet) = self.packets.get_mut(handle) {
            packet.active = true;
            self.air.insert(handle);
        }
    }

    ///
    /// Re-tests every pending positive arrival against its receiver's
    /// interference model. Invoked whenever traffic starts or ends while
    /// interference modeling is enabled; disturbance is final, a packet
    /// once disturbed stays dropped.
    ///
    pub(crate) fn test_for_interference(&mut self) {
        if !self.config.interference || self.air.is_empty() {
            return;
        }
        let candidates: Vec<(PacketHandle, NodeId)> = self
            .packets
            .iter()
            .filter(|(_, p)| {
                p.positive_delivery && p.kind != PacketKind::Dummy && p.arriving_time > self.now
            })
            .map(|(h, p)| (h, p.destination))
            .collect();

        for (handle, dest) in candidates {
            let Some(slot) = self.nodes.get_mut(&dest) else {
                continue;
            };
            let Some(model) = slot.models.interference.take() else {
                continue;
            };
            let disturbed = {
                let packet = self.packets.get(handle).expect("candidate just listed");
                model.is_disturbed(packet, self)
            };
            self.nodes
                .get_mut(&dest)
                .expect("receiver vanished mid-test")
                .models
                .interference = Some(model);
            if disturbed {
                let packet = self.packets.get_mut(handle).expect("candidate just listed");
                packet.positive_delivery = false;
                trace!("packet {} towards {dest} disturbed", packet.seq);
            }
        }
    }

    ///
    /// Finishes the journey of a single packet whose arrival time has been
    /// reached: releases its edge and airborne bookkeeping and decides
    /// between delivery, a nack and silent disposal.
    ///
    pub(crate) fn process_arrival(&mut self, handle: PacketHandle) -> Arrival {
        let Some(packet) = self.packets.get(handle) else {
            return Arrival::Consumed;
        };
        let edge = packet.edge;
        let active = packet.active;
        let kind = packet.kind;
        let origin = packet.origin;
        let dest = packet.destination;
        let mut positive = packet.positive_delivery;

        if let Some(e) = edge {
            match self.edges.get_mut(e) {
                Some(edge) => edge.traveling = edge.traveling.saturating_sub(1),
                // The edge died mid-flight; the packet dies with it.
                None => positive = false,
            }
        }
        if active {
            self.air.remove(handle);
            self.test_for_interference();
        }

        if kind == PacketKind::Dummy {
            self.packets.free(handle);
            return Arrival::Consumed;
        }

        if positive {
            if let Some(slot) = self.nodes.get_mut(&dest) {
                slot.core.buffer.arrived.push(handle);
                return Arrival::Delivered { dest };
            }
            positive = false;
        }

        let packet = self.packets.get_mut(handle).expect("packet checked above");
        packet.positive_delivery = positive;
        if self.config.nack_generation && self.nodes.contains_key(&origin) {
            trace!("packet {} towards {dest} dropped, nacking {origin}", packet.seq);
            Arrival::Dropped { origin }
        } else {
            self.packets.free(handle);
            Arrival::Consumed
        }
    }

    ///
    /// Scans a node's arrival buffer for packets due now. Successful
    /// deliveries move to the arrived list; failures are routed to their
    /// origin's nack box for the next round.
    ///
    pub(crate) fn update_message_buffer(&mut self, id: NodeId) {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return;
        };
        let in_flight = std::mem::take(&mut slot.core.buffer.in_flight);
        let mut keep = Vec::with_capacity(in_flight.len());
        let mut due = Vec::new();
        for handle in in_flight {
            let packet = self.packets.get(handle).expect("buffered packet freed early");
            // A packet sent this round stays in flight even at zero delay;
            // delivery happening in the sending round would depend on the
            // node iteration order.
            if packet.arriving_time <= self.now && packet.sending_time < self.now {
                due.push(handle);
            } else {
                keep.push(handle);
            }
        }
        self.nodes
            .get_mut(&id)
            .expect("node vanished mid-scan")
            .core
            .buffer
            .in_flight = keep;

        for handle in due {
            if let Arrival::Dropped { origin } = self.process_arrival(handle) {
                self.push_nack(origin, handle);
            }
        }
    }

    /// Scans the buffer of packets addressed to nodes that never existed.
    pub(crate) fn update_orphans(&mut self) {
        let orphans = std::mem::take(&mut self.orphans);
        for handle in orphans {
            let due = self
                .packets
                .get(handle)
                .is_some_and(|p| p.arriving_time <= self.now && p.sending_time < self.now);
            if due {
                if let Arrival::Dropped { origin } = self.process_arrival(handle) {
                    self.push_nack(origin, handle);
                }
            } else {
                self.orphans.push(handle);
            }
        }
    }

    /// Records a drop report for the round after the current one.
    pub(crate) fn push_nack(&mut self, origin: NodeId, handle: PacketHandle) {
        let parity = self.parity() ^ 1;
        if let Some(slot) = self.nodes.get_mut(&origin) {
            slot.core.nacks.push(parity, handle);
        } else {
            self.packets.free(handle);
        }
    }

    /// Builds the inbox of packets a node reads this step, draining its
    /// arrived list.
    pub(crate) fn collect_inbox(&mut self, id: NodeId) -> Inbox {
        let arrived = self
            .nodes
            .get_mut(&id)
            .map(|slot| std::mem::take(&mut slot.core.buffer.arrived))
            .unwrap_or_default();
        Inbox::new(arrived, &self.packets)
    }

    /// Builds the inbox of this round's drop reports for a node.
    pub(crate) fn collect_nack_inbox(&mut self, id: NodeId) -> Inbox {
        let parity = self.parity();
        let handles = self
            .nodes
            .get_mut(&id)
            .map(|slot| slot.core.nacks.take(parity))
            .unwrap_or_default();
        Inbox::new(handles, &self.packets)
    }

    /// Builds an inbox over explicit handles (asynchronous deliveries).
    pub(crate) fn make_inbox(&self, handles: Vec<PacketHandle>) -> Inbox {
        Inbox::new(handles, &self.packets)
    }

    /// Frees the packets behind an inbox after the step read them.
    pub(crate) fn free_inbox(&mut self, inbox: &Inbox) {
        for handle in inbox.handles() {
            self.packets.free(*handle);
        }
    }

    fn free_packet(&mut self, handle: PacketHandle) {
        if let Some(packet) = self.packets.free(handle) {
            if packet.active {
                self.air.remove(handle);
            }
            if let Some(edge) = packet.edge.and_then(|e| self.edges.get_mut(e)) {
                edge.traveling = edge.traveling.saturating_sub(1);
            }
        }
    }

    // # Timers

    pub(crate) fn set_node_timer(
        &mut self,
        id: NodeId,
        timer: Box<dyn Timer>,
        delay: f64,
    ) -> TimerHandle {
        assert!(delay >= 0.0, "timer delay must be non-negative (got {delay})");
        let fire_time = self.now + delay;
        let timer_id = self.next_timer_id;
        self.next_timer_id += 1;

        match self.config.mode {
            Mode::Synchronous => self
                .nodes
                .get_mut(&id)
                .expect("unknown node")
                .core
                .timers
                .schedule(timer_id, fire_time, timer),
            Mode::Asynchronous => {
                let event = self.queue.insert(
                    fire_time,
                    Some(id),
                    Event::NodeTimer {
                        node: id,
                        timer_id,
                        timer,
                    },
                );
                self.timer_events.insert(timer_id, event);
                TimerHandle(timer_id)
            }
        }
    }

    pub(crate) fn cancel_node_timer(&mut self, id: NodeId, handle: TimerHandle) -> bool {
        match self.config.mode {
            Mode::Synchronous => self
                .nodes
                .get_mut(&id)
                .map(|slot| slot.core.timers.cancel(handle))
                .unwrap_or(false),
            Mode::Asynchronous => self
                .timer_events
                .remove(&handle.0)
                .map(|event| self.queue.drop_event(event))
                .unwrap_or(false),
        }
    }

    ///
    /// Schedules a global timer to fire after `delay` time units, bound to
    /// the simulation rather than a node.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    ///
    pub fn set_global_timer(&mut self, timer: Box<dyn GlobalTimer>, delay: f64) -> TimerHandle {
        assert!(delay >= 0.0, "timer delay must be non-negative (got {delay})");
        let fire_time = self.now + delay;
        let timer_id = self.next_timer_id;
        self.next_timer_id += 1;

        match self.config.mode {
            Mode::Synchronous => self.global_timers.schedule(timer_id, fire_time, timer),
            Mode::Asynchronous => {
                let event =
                    self.queue
                        .insert(fire_time, None, Event::GlobalTimer { timer_id, timer });
                self.timer_events.insert(timer_id, event);
                TimerHandle(timer_id)
            }
        }
    }

    /// Cancels a pending global timer. Returns whether one was revoked.
    pub fn cancel_global_timer(&mut self, handle: TimerHandle) -> bool {
        match self.config.mode {
            Mode::Synchronous => self.global_timers.cancel(handle),
            Mode::Asynchronous => self
                .timer_events
                .remove(&handle.0)
                .map(|event| self.queue.drop_event(event))
                .unwrap_or(false),
        }
    }

    pub(crate) fn drain_due_global_timers(&mut self) -> Vec<TimerEntry<Box<dyn GlobalTimer>>> {
        self.global_timers.drain_due(self.now)
    }

    pub(crate) fn drain_due_node_timers(&mut self, id: NodeId) -> Vec<TimerEntry<Box<dyn Timer>>> {
        self.nodes
            .get_mut(&id)
            .map(|slot| slot.core.timers.drain_due(self.now))
            .unwrap_or_default()
    }

    // # Per-round phases

    /// Moves every node to the position its mobility model dictates.
    pub(crate) fn mobility_phase(&mut self) {
        for id in self.order.clone() {
            let Some(model) = self
                .nodes
                .get_mut(&id)
                .and_then(|slot| slot.models.mobility.take())
            else {
                continue;
            };
            let mut model = model;
            let pos = model.next_position(id, self);
            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.models.mobility = Some(model);
                slot.core.position = pos;
            }
        }
    }

    ///
    /// Lets every node's connectivity model re-validate (and extend) the
    /// node's outgoing edges.
    ///
    pub(crate) fn connectivity_phase(&mut self) {
        for id in self.order.clone() {
            let Some(model) = self
                .nodes
                .get_mut(&id)
                .and_then(|slot| slot.models.connectivity.take())
            else {
                continue;
            };
            let mut model = model;
            let changed = model.update_connections(id, self);
            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.models.connectivity = Some(model);
                if changed {
                    slot.core.neighborhood_changed = true;
                }
            }
        }
    }

    ///
    /// Runs the revalidation pass over every node: edges not re-validated
    /// since the previous pass are deleted, survivors are invalidated for
    /// the next cycle. Both endpoints of a deleted edge see a neighborhood
    /// change.
    ///
    pub(crate) fn revalidation_phase(&mut self) {
        for id in self.order.clone() {
            let slot = self.nodes.get_mut(&id).expect("node order out of sync");
            let doomed_ends: Vec<NodeId> = slot
                .core
                .connections
                .iter()
                .filter(|&h| self.edges.get(h).is_some_and(|e| !e.valid))
                .filter_map(|h| self.edges.get(h).map(|e| e.end))
                .collect();
            let removed = slot
                .core
                .connections
                .remove_invalid_links(&mut self.edges);
            if removed > 0 {
                self.mark_neighborhood_changed(id);
                for end in doomed_ends {
                    self.mark_neighborhood_changed(end);
                }
                trace!("{id}: {removed} stale edge(s) removed");
            }
        }
    }

    // # Driver plumbing

    pub(crate) fn node_order(&self) -> Vec<NodeId> {
        self.order.clone()
    }

    pub(crate) fn take_behavior(&mut self, id: NodeId) -> Option<Box<dyn Node>> {
        self.nodes.get_mut(&id).and_then(|slot| slot.behavior.take())
    }

    pub(crate) fn put_behavior(&mut self, id: NodeId, behavior: Box<dyn Node>) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.behavior = Some(behavior);
        }
    }

    pub(crate) fn take_neighborhood_changed(&mut self, id: NodeId) -> bool {
        self.nodes
            .get_mut(&id)
            .map(|slot| std::mem::take(&mut slot.core.neighborhood_changed))
            .unwrap_or(false)
    }

    pub(crate) fn next_event(&mut self) -> Option<EventNode> {
        self.queue.get_next_event()
    }

    pub(crate) fn requeue_event(&mut self, event: EventNode) {
        self.queue.requeue(event);
    }

    /// Returns the number of pending events (asynchronous mode), e.g. for
    /// an [`on_empty_queue`](crate::runtime::Scenario::on_empty_queue) hook
    /// deciding whether its refill took.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Releases the bookkeeping of a timer whose event just fired.
    pub(crate) fn clear_timer_event(&mut self, timer_id: u64) {
        self.timer_events.remove(&timer_id);
    }

    pub(crate) fn scheduled_timer_events(&self) -> usize {
        self.timer_events.len()
    }

    pub(crate) fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeCore {
        &self.nodes.get(&id).expect("unknown node").core
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeCore {
        &mut self.nodes.get_mut(&id).expect("unknown node").core
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("now", &self.now)
            .field("round", &self.round)
            .field("nodes", &self.order.len())
            .field("edges", &self.edges.len())
            .field("packets", &self.packets.len())
            .field("airborne", &self.air.len())
            .field("pending_events", &self.queue.len())
            .finish()
    }
}
