//! Simulation configuration.

use serde::{Deserialize, Serialize};

///
/// The execution model of a simulation.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    ///
    /// Round-synchronous execution: all nodes step once per round in a
    /// fixed global phase order, time advances by one unit per round.
    ///
    #[default]
    Synchronous,
    ///
    /// Event-driven execution: time jumps from event to event, nodes only
    /// step when something happens to them.
    ///
    Asynchronous,
}

///
/// The dimensionality of the deployment area.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Dim {
    /// Nodes live in the plane, the z coordinate stays zero.
    #[default]
    D2,
    /// Nodes live in 3-space.
    D3,
}

///
/// The static configuration of a simulation, fixed at build time.
///
/// Deserializable so runs can be configured from a file; every field has a
/// default matching the simplest (and cheapest) setup: synchronous,
/// reliable, interference-free, immobile.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// The execution model.
    pub mode: Mode,
    ///
    /// Enables interference modeling: airborne packets are tracked and
    /// every pending arrival is re-tested against the receivers'
    /// interference models whenever traffic starts or ends.
    ///
    pub interference: bool,
    ///
    /// Enables negative acknowledgements: a sender learns about a dropped
    /// packet one round after the packet would have arrived.
    ///
    pub nack_generation: bool,
    /// Enables the per-round mobility phase.
    pub mobility: bool,
    ///
    /// Fires the observers' redraw hook every `refresh_rate` rounds (or
    /// events, in asynchronous mode). Zero disables redraw notifications.
    ///
    pub refresh_rate: u64,
    /// The dimensionality of node positions.
    pub dim: Dim,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Synchronous,
            interference: false,
            nack_generation: false,
            mobility: false,
            refresh_rate: 0,
            dim: Dim::D2,
        }
    }
}
