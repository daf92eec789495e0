//! The most common types, for glob import.
//!
//! ```
//! use algosim::prelude::*;
//! ```

pub use crate::air::AirBuffer;
pub use crate::buffer::Inbox;
pub use crate::config::{Dim, Mode, SimConfig};
pub use crate::edge::{Edge, EdgeHandle, EdgeId};
pub use crate::message::Message;
pub use crate::models::{
    ConnectivityModel, ConstantTransmission, InterferenceModel, LossyDelivery,
    MessageTransmissionModel, MobilityModel, ModelKind, ModelRegistry, NoConnectivity,
    NoInterference, NoMobility, RandomTransmission, ReliabilityModel, ReliableDelivery,
    StaticConnectivity, UnitDiskConnectivity,
};
pub use crate::node::{Api, Node, NodeCore, NodeId};
pub use crate::observer::Observer;
pub use crate::packet::{Packet, PacketHandle, PacketKind};
pub use crate::position::Position;
pub use crate::runtime::{
    AbortHandle, Builder, CreationError, RequirementError, Runtime, RuntimeError, RuntimeLimit,
    Scenario, StopReason, Summary,
};
pub use crate::time::SimTime;
pub use crate::timer::{GlobalTimer, Timer, TimerHandle};
pub use crate::world::World;
