//! The pluggable model strategies of a simulation.
//!
//! A node references four model strategies (connectivity, mobility,
//! reliability, interference); the transmission-delay model is global, one
//! per simulation. The kernel only calls the trait methods below and treats
//! everything behind them as opaque policy.
//!
//! Models are either attached directly (boxed) or created by name through
//! the [`ModelRegistry`], which replaces construction-by-class-name with an
//! explicit name → constructor table.

use crate::node::{Node, NodeId};
use crate::packet::Packet;
use crate::position::Position;
use crate::runtime::CreationError;
use crate::world::World;
use fxhash::FxHashMap;
use rand::{Rng, RngCore};
use std::fmt::{self, Debug};

///
/// Decides which outgoing connections a node has.
///
/// Called once per synchronous round for every node, after mobility and
/// before any node steps. The model re-validates wanted edges by calling
/// [`World::add_edge`]; edges it does not re-validate are deleted by the
/// revalidation pass that follows immediately after.
///
pub trait ConnectivityModel: 'static {
    ///
    /// Updates the outgoing connections of `node`. Returns whether the
    /// model changed the topology (new edges created).
    ///
    fn update_connections(&mut self, node: NodeId, world: &mut World) -> bool;
}

///
/// Decides whether a packet survives the transmission medium.
///
pub trait ReliabilityModel: 'static {
    /// Evaluated once at send time, before the packet takes off.
    fn reaches_destination(&mut self, packet: &Packet, rng: &mut dyn RngCore) -> bool;
}

///
/// Decides where a node moves to.
///
/// Called once per synchronous round for every node, before connectivity is
/// updated, when mobility is enabled in the configuration.
///
pub trait MobilityModel: 'static {
    /// Returns the node's position for the upcoming round.
    fn next_position(&mut self, node: NodeId, world: &mut World) -> Position;
}

///
/// The interference-overlap predicate.
///
/// The exact overlap test is project policy, not a fixed core algorithm:
/// the model receives the packet under test and the world (whose
/// [`airborne`](World::airborne) set lists all concurrently tracked
/// transmissions) and decides whether the packet is disturbed.
///
pub trait InterferenceModel: 'static {
    /// Indicates whether concurrent transmissions make `packet` fail.
    fn is_disturbed(&self, packet: &Packet, world: &World) -> bool;
}

///
/// Determines how long a message travels from sender to target.
///
pub trait MessageTransmissionModel: 'static {
    ///
    /// Returns the transmission delay in seconds. Must be non-negative;
    /// the kernel asserts this.
    ///
    fn time_to_reach(
        &mut self,
        sender: NodeId,
        target: NodeId,
        sender_pos: Position,
        target_pos: Position,
        rng: &mut dyn RngCore,
    ) -> f64;
}

// # Default models

///
/// Re-validates every currently existing outgoing edge, keeping a
/// hand-built topology stable across rounds. The default connectivity
/// model.
///
#[derive(Debug, Default)]
pub struct StaticConnectivity;

impl ConnectivityModel for StaticConnectivity {
    fn update_connections(&mut self, node: NodeId, world: &mut World) -> bool {
        let endpoints: Vec<NodeId> = world.neighbors(node);
        for end in endpoints {
            world.add_edge(node, end, true);
        }
        false
    }
}

///
/// Never validates anything: every edge of the node disappears at the next
/// revalidation pass.
///
#[derive(Debug, Default)]
pub struct NoConnectivity;

impl ConnectivityModel for NoConnectivity {
    fn update_connections(&mut self, _node: NodeId, _world: &mut World) -> bool {
        false
    }
}

///
/// Connects a node to every other node within a fixed radius (the classic
/// unit disk graph).
///
#[derive(Debug)]
pub struct UnitDiskConnectivity {
    radius: f64,
}

impl UnitDiskConnectivity {
    /// Creates the model with the given connection radius.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        assert!(radius >= 0.0, "connection radius must be non-negative");
        Self { radius }
    }
}

impl ConnectivityModel for UnitDiskConnectivity {
    fn update_connections(&mut self, node: NodeId, world: &mut World) -> bool {
        let pos = world.position(node).expect("node not registered");
        let r2 = self.radius * self.radius;
        let in_range: Vec<NodeId> = world
            .node_ids()
            .filter(|&other| other != node)
            .filter(|&other| {
                world
                    .position(other)
                    .is_some_and(|p| pos.dist_squared(&p) <= r2)
            })
            .collect();

        let mut changed = false;
        for other in in_range {
            changed |= world.add_edge(node, other, true);
        }
        changed
    }
}

/// Keeps every node where it is. The default mobility model.
#[derive(Debug, Default)]
pub struct NoMobility;

impl MobilityModel for NoMobility {
    fn next_position(&mut self, node: NodeId, world: &mut World) -> Position {
        world.position(node).expect("node not registered")
    }
}

/// Every packet reaches its destination. The default reliability model.
#[derive(Debug, Default)]
pub struct ReliableDelivery;

impl ReliabilityModel for ReliableDelivery {
    fn reaches_destination(&mut self, _packet: &Packet, _rng: &mut dyn RngCore) -> bool {
        true
    }
}

/// Drops each packet independently with a fixed probability.
#[derive(Debug)]
pub struct LossyDelivery {
    drop_probability: f64,
}

impl LossyDelivery {
    /// Creates the model with the given per-packet drop probability.
    #[must_use]
    pub fn new(drop_probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&drop_probability),
            "drop probability must lie in [0, 1]"
        );
        Self { drop_probability }
    }
}

impl ReliabilityModel for LossyDelivery {
    fn reaches_destination(&mut self, _packet: &Packet, rng: &mut dyn RngCore) -> bool {
        rng.gen::<f64>() >= self.drop_probability
    }
}

/// No transmission ever collides. The default interference model.
#[derive(Debug, Default)]
pub struct NoInterference;

impl InterferenceModel for NoInterference {
    fn is_disturbed(&self, _packet: &Packet, _world: &World) -> bool {
        false
    }
}

///
/// A fixed transmission delay for every message. The default transmission
/// model, with a delay of one time unit.
///
#[derive(Debug)]
pub struct ConstantTransmission {
    delay: f64,
}

impl ConstantTransmission {
    /// Creates the model with the given fixed delay.
    #[must_use]
    pub fn new(delay: f64) -> Self {
        assert!(delay >= 0.0, "transmission delay must be non-negative");
        Self { delay }
    }
}

impl Default for ConstantTransmission {
    fn default() -> Self {
        Self { delay: 1.0 }
    }
}

impl MessageTransmissionModel for ConstantTransmission {
    fn time_to_reach(
        &mut self,
        _sender: NodeId,
        _target: NodeId,
        _sender_pos: Position,
        _target_pos: Position,
        _rng: &mut dyn RngCore,
    ) -> f64 {
        self.delay
    }
}

///
/// A uniformly random transmission delay from a fixed interval.
///
#[derive(Debug)]
pub struct RandomTransmission {
    min: f64,
    max: f64,
}

impl RandomTransmission {
    /// Creates the model drawing delays uniformly from `[min, max]`.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        assert!(0.0 <= min && min <= max, "invalid delay interval");
        Self { min, max }
    }
}

impl MessageTransmissionModel for RandomTransmission {
    fn time_to_reach(
        &mut self,
        _sender: NodeId,
        _target: NodeId,
        _sender_pos: Position,
        _target_pos: Position,
        rng: &mut dyn RngCore,
    ) -> f64 {
        rng.gen_range(self.min..=self.max)
    }
}

// # Registry

/// The model kind a registry lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// A connectivity model.
    Connectivity,
    /// A mobility model.
    Mobility,
    /// A reliability model.
    Reliability,
    /// An interference model.
    Interference,
    /// A transmission-delay model.
    Transmission,
    /// A node behavior type.
    Node,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connectivity => "connectivity model",
            Self::Mobility => "mobility model",
            Self::Reliability => "reliability model",
            Self::Interference => "interference model",
            Self::Transmission => "transmission model",
            Self::Node => "node type",
        };
        write!(f, "{s}")
    }
}

type Factory<T> = Box<dyn Fn() -> Box<T>>;

///
/// A registry mapping model and node-type names to constructors.
///
/// Unknown names are fatal at setup time
/// ([`CreationError`](crate::runtime::CreationError)).
///
#[derive(Default)]
pub struct ModelRegistry {
    connectivity: FxHashMap<String, Factory<dyn ConnectivityModel>>,
    mobility: FxHashMap<String, Factory<dyn MobilityModel>>,
    reliability: FxHashMap<String, Factory<dyn ReliabilityModel>>,
    interference: FxHashMap<String, Factory<dyn InterferenceModel>>,
    transmission: FxHashMap<String, Factory<dyn MessageTransmissionModel>>,
    nodes: FxHashMap<String, Factory<dyn Node>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in models pre-registered under
    /// their type names.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_connectivity("StaticConnectivity", || Box::new(StaticConnectivity));
        registry.register_connectivity("NoConnectivity", || Box::new(NoConnectivity));
        registry.register_mobility("NoMobility", || Box::new(NoMobility));
        registry.register_reliability("ReliableDelivery", || Box::new(ReliableDelivery));
        registry.register_interference("NoInterference", || Box::new(NoInterference));
        registry.register_transmission("ConstantTransmission", || {
            Box::new(ConstantTransmission::default())
        });
        registry
    }

    /// Registers a connectivity model constructor.
    pub fn register_connectivity(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn ConnectivityModel> + 'static,
    ) {
        self.connectivity
            .insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Registers a mobility model constructor.
    pub fn register_mobility(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn MobilityModel> + 'static,
    ) {
        self.mobility.insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Registers a reliability model constructor.
    pub fn register_reliability(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn ReliabilityModel> + 'static,
    ) {
        self.reliability
            .insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Registers an interference model constructor.
    pub fn register_interference(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn InterferenceModel> + 'static,
    ) {
        self.interference
            .insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Registers a transmission model constructor.
    pub fn register_transmission(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn MessageTransmissionModel> + 'static,
    ) {
        self.transmission
            .insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Registers a node behavior constructor.
    pub fn register_node_type(
        &mut self,
        name: impl AsRef<str>,
        f: impl Fn() -> Box<dyn Node> + 'static,
    ) {
        self.nodes.insert(name.as_ref().to_string(), Box::new(f));
    }

    /// Instantiates a connectivity model by name.
    ///
    /// # Errors
    ///
    /// Fails if no such model is registered.
    pub fn create_connectivity(
        &self,
        name: &str,
    ) -> Result<Box<dyn ConnectivityModel>, CreationError> {
        self.connectivity
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Connectivity, name))
    }

    /// Instantiates a mobility model by name.
    ///
    /// # Errors
    ///
    /// Fails if no such model is registered.
    pub fn create_mobility(&self, name: &str) -> Result<Box<dyn MobilityModel>, CreationError> {
        self.mobility
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Mobility, name))
    }

    /// Instantiates a reliability model by name.
    ///
    /// # Errors
    ///
    /// Fails if no such model is registered.
    pub fn create_reliability(
        &self,
        name: &str,
    ) -> Result<Box<dyn ReliabilityModel>, CreationError> {
        self.reliability
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Reliability, name))
    }

    /// Instantiates an interference model by name.
    ///
    /// # Errors
    ///
    /// Fails if no such model is registered.
    pub fn create_interference(
        &self,
        name: &str,
    ) -> Result<Box<dyn InterferenceModel>, CreationError> {
        self.interference
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Interference, name))
    }

    /// Instantiates a transmission model by name.
    ///
    /// # Errors
    ///
    /// Fails if no such model is registered.
    pub fn create_transmission(
        &self,
        name: &str,
    ) -> Result<Box<dyn MessageTransmissionModel>, CreationError> {
        self.transmission
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Transmission, name))
    }

    /// Instantiates a node behavior by type name.
    ///
    /// # Errors
    ///
    /// Fails if no such node type is registered.
    pub fn create_node(&self, name: &str) -> Result<Box<dyn Node>, CreationError> {
        self.nodes
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CreationError::unknown(ModelKind::Node, name))
    }
}

impl Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("connectivity", &self.connectivity.len())
            .field("mobility", &self.mobility.len())
            .field("reliability", &self.reliability.len())
            .field("interference", &self.interference.len())
            .field("transmission", &self.transmission.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
