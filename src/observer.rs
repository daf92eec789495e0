//! Progress notifications for external consumers.

use crate::node::NodeId;
use crate::world::World;

///
/// A passive spectator of a running simulation.
///
/// Observers receive read-only notifications from the drivers; they replace
/// an attached GUI loop for headless runs (statistics collection, progress
/// bars, trace dumps). All methods are defaulted to no-ops.
///
#[allow(unused_variables)]
pub trait Observer: 'static {
    ///
    /// The world reached a consistent state and a visualization could
    /// repaint. Fired every `refresh_rate` rounds (synchronous) or events
    /// (asynchronous); never fired when the rate is zero.
    ///
    fn redraw_requested(&mut self, world: &World) {}

    /// A synchronous round completed.
    fn round_complete(&mut self, round: u64) {}

    ///
    /// An asynchronous event was handled. `number` counts handled events
    /// from 1; `node` names the owning node, `None` for global events.
    ///
    fn event_handled(&mut self, number: usize, node: Option<NodeId>) {}

    /// A node was registered.
    fn node_added(&mut self, node: NodeId) {}

    /// A node was removed.
    fn node_removed(&mut self, node: NodeId) {}
}
