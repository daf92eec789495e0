//! Node identity, behavior hooks and the per-step API surface.

use crate::buffer::{Inbox, NackBox, PacketBuffer};
use crate::config::SimConfig;
use crate::connections::Connections;
use crate::message::Message;
use crate::models::{
    ConnectivityModel, InterferenceModel, MobilityModel, NoInterference, NoMobility,
    ReliabilityModel, ReliableDelivery, StaticConnectivity,
};
use crate::packet::{Packet, PacketHandle};
use crate::position::Position;
use crate::runtime::RequirementError;
use crate::time::SimTime;
use crate::timer::{Timer, TimerCollection, TimerHandle};
use crate::world::World;
use rand::distributions::{Distribution, Standard};
use rand::{Rng, RngCore};
use std::fmt::Display;

///
/// The identity of a registered node.
///
/// Ids are assigned monotonically and never reused while the node is
/// registered. After a node is removed, its id is not referenced by any
/// live edge, event or timer.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Returns the raw numeric id.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node[{}]", self.0)
    }
}

///
/// The user-defined behavior of a node.
///
/// Every round (synchronous mode), the kernel drives a node through a fixed
/// sequence of hooks:
///
/// 1. the arrival buffer is scanned for packets due this round,
/// 2. [`pre_step`](Node::pre_step),
/// 3. [`neighborhood_change`](Node::neighborhood_change), iff the topology
///    around this node changed this round,
/// 4. due timers fire, ordered by exact fire time,
/// 5. [`handle_nack_messages`](Node::handle_nack_messages), iff nack
///    generation is enabled,
/// 6. [`handle_messages`](Node::handle_messages) with the full inbox of the
///    round,
/// 7. [`post_step`](Node::post_step).
///
/// This ordering is a contract: `handle_messages` always observes the
/// complete, already-delivered inbox for the round, against a topology that
/// no sibling node will change until the round is over.
///
/// # Example
///
/// ```
/// use algosim::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Hello;
/// impl Message for Hello {
///     fn clone_message(&self) -> Box<dyn Message> {
///         Box::new(self.clone())
///     }
/// }
///
/// struct Greeter {
///     received: usize,
/// }
///
/// impl Node for Greeter {
///     fn pre_step(&mut self, api: &mut Api<'_>) {
///         api.broadcast(&Hello);
///     }
///
///     fn handle_messages(&mut self, _api: &mut Api<'_>, inbox: &Inbox) {
///         self.received += inbox.len();
///     }
/// }
/// ```
///
#[allow(unused_variables)]
pub trait Node: 'static {
    ///
    /// Invoked once when the node is registered, before its first step.
    ///
    fn init(&mut self, api: &mut Api<'_>) {}

    ///
    /// Validates that the node can run under the given configuration.
    /// Invoked once at registration; an error aborts the setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration violates a requirement of this
    /// node type.
    ///
    fn check_requirements(&self, config: &SimConfig) -> Result<(), RequirementError> {
        Ok(())
    }

    /// Invoked at the start of every step of this node.
    fn pre_step(&mut self, api: &mut Api<'_>) {}

    ///
    /// Invoked when the topology around this node changed this round,
    /// before messages are handled.
    ///
    fn neighborhood_change(&mut self, api: &mut Api<'_>) {}

    ///
    /// The message handler. Receives the inbox of packets delivered for
    /// this step; the packets are freed when the step completes.
    ///
    fn handle_messages(&mut self, api: &mut Api<'_>, inbox: &Inbox);

    ///
    /// Receives negative acknowledgements for packets of this node that
    /// were dropped. Only invoked when nack generation is enabled.
    ///
    fn handle_nack_messages(&mut self, api: &mut Api<'_>, nacks: &Inbox) {}

    /// Invoked at the end of every step of this node.
    fn post_step(&mut self, api: &mut Api<'_>) {}
}

///
/// The per-node model strategies. Unset slots are filled with the default
/// models at registration.
///
pub(crate) struct NodeModels {
    pub(crate) connectivity: Option<Box<dyn ConnectivityModel>>,
    pub(crate) mobility: Option<Box<dyn MobilityModel>>,
    pub(crate) reliability: Option<Box<dyn ReliabilityModel>>,
    pub(crate) interference: Option<Box<dyn InterferenceModel>>,
}

impl Default for NodeModels {
    fn default() -> Self {
        Self {
            connectivity: Some(Box::new(StaticConnectivity)),
            mobility: Some(Box::new(NoMobility)),
            reliability: Some(Box::new(ReliableDelivery)),
            interference: Some(Box::new(NoInterference)),
        }
    }
}

///
/// The kernel-owned state of a node: identity, position, connections,
/// buffers and timers.
///
#[derive(Debug)]
pub struct NodeCore {
    pub(crate) id: NodeId,
    pub(crate) position: Position,
    pub(crate) intensity: f64,
    pub(crate) connections: Connections,
    pub(crate) buffer: PacketBuffer,
    pub(crate) nacks: NackBox,
    pub(crate) timers: TimerCollection<Box<dyn Timer>>,
    pub(crate) neighborhood_changed: bool,
}

impl NodeCore {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            position: Position::ORIGIN,
            intensity: 1.0,
            connections: Connections::new(),
            buffer: PacketBuffer::default(),
            nacks: NackBox::default(),
            timers: TimerCollection::default(),
            neighborhood_changed: false,
        }
    }

    /// Returns the node's id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node's position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the node's outgoing connections.
    #[must_use]
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Returns the node's sending intensity.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }
}

pub(crate) struct NodeSlot {
    pub(crate) core: NodeCore,
    pub(crate) behavior: Option<Box<dyn Node>>,
    pub(crate) models: NodeModels,
}

///
/// The capability handle of a node during one of its hooks.
///
/// An `Api` only exists while the kernel runs a hook of the node, which
/// makes originating traffic from outside a step impossible by
/// construction (the original failure mode of calling `send` outside an
/// active round).
///
pub struct Api<'a> {
    pub(crate) world: &'a mut World,
    pub(crate) node: NodeId,
}

impl Api<'_> {
    /// Returns the id of the node this API belongs to.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.world.now()
    }

    /// Returns the current round number (zero in asynchronous mode).
    #[must_use]
    pub fn round(&self) -> u64 {
        self.world.round()
    }

    /// Returns the simulation configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        self.world.config()
    }

    /// Returns a read view of the whole simulation state.
    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// Returns this node's position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.world.position(self.node).expect("node vanished mid-step")
    }

    /// Moves this node to `pos`.
    pub fn set_position(&mut self, pos: Position) {
        self.world.set_position(self.node, pos);
    }

    /// Returns this node's sending intensity.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.world.node(self.node).intensity
    }

    ///
    /// Sets this node's sending intensity.
    ///
    /// # Panics
    ///
    /// Panics if `intensity` lies outside `[0, 1]`.
    ///
    pub fn set_intensity(&mut self, intensity: f64) {
        assert!(
            (0.0..=1.0).contains(&intensity),
            "sending intensity must lie in [0, 1] (got {intensity})"
        );
        self.world.node_mut(self.node).intensity = intensity;
    }

    /// Returns the ids of this node's current neighbors (outgoing edges).
    #[must_use]
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.world.neighbors(self.node)
    }

    ///
    /// Returns the packet behind an inbox handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, i.e. kept beyond the step it was
    /// delivered in.
    ///
    #[must_use]
    pub fn packet(&self, handle: PacketHandle) -> &Packet {
        self.world
            .packet(handle)
            .expect("stale packet handle; inbox packets are freed after the step")
    }

    ///
    /// Returns the message of an inbox packet casted to type `T`, or `None`
    /// on a type mismatch.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    ///
    #[must_use]
    pub fn message<T: Message>(&self, handle: PacketHandle) -> Option<&T> {
        self.packet(handle).message_as::<T>()
    }

    ///
    /// Sends a clone of `msg` to `target` along the connecting edge.
    ///
    /// Without an edge to `target` the packet dies on the way; with nack
    /// generation enabled the loss is reported back one round after the
    /// packet should have arrived.
    ///
    pub fn send(&mut self, msg: &dyn Message, target: NodeId) {
        self.world.send_from(self.node, msg, target);
    }

    ///
    /// Sends a clone of `msg` on every outgoing edge.
    ///
    /// Under interference modeling, the whole burst is tracked as a single
    /// transmission in the air; an isolated broadcaster still emits one
    /// (undeliverable) placeholder packet to keep that bookkeeping
    /// consistent.
    ///
    pub fn broadcast(&mut self, msg: &dyn Message) {
        self.world.broadcast_from(self.node, msg);
    }

    ///
    /// Sends a clone of `msg` directly to `target`, bypassing edges,
    /// reliability and interference. Intended for out-of-band signaling;
    /// the delivery time still comes from the transmission model.
    ///
    pub fn send_direct(&mut self, msg: &dyn Message, target: NodeId) {
        self.world.send_direct_from(self.node, msg, target);
    }

    ///
    /// Schedules `timer` to fire on this node after `delay` time units.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    ///
    pub fn set_timer(&mut self, timer: Box<dyn Timer>, delay: f64) -> TimerHandle {
        self.world.set_node_timer(self.node, timer, delay)
    }

    ///
    /// Cancels a previously scheduled timer. Returns whether a pending
    /// timer was revoked; a cancelled timer performs no action when its
    /// fire time is reached.
    ///
    pub fn cancel_timer(&mut self, handle: TimerHandle) -> bool {
        self.world.cancel_node_timer(self.node, handle)
    }

    /// Returns the simulation rng.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        self.world.rng()
    }

    /// Generates a random instance of type `T` with a standard
    /// distribution.
    #[must_use]
    pub fn random<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng().gen()
    }

    /// Generates a random instance of type `T` with a distribution of type
    /// `D`.
    pub fn sample<T, D>(&mut self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.rng().sample(distr)
    }
}
