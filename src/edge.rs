//! Directed links between nodes.

use crate::node::NodeId;
use crate::util::Handle;
use std::fmt::Display;

/// A handle to an [`Edge`] stored in the edge arena.
pub type EdgeHandle = Handle<Edge>;

///
/// A stable numeric identifier of an edge.
///
/// Unlike [`EdgeHandle`], the id is never recycled within a run.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// A directed connection from one node to another.
///
/// Edges are owned by the source node's
/// [`Connections`](crate::connections::Connections) collection and live in
/// the world's edge arena. An edge carries a `valid` flag driving the
/// per-round revalidation protocol: the flag is reset after every
/// revalidation pass and the edge is deleted on the next pass unless the
/// connectivity model re-validated it in between.
///
#[derive(Debug)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
    pub(crate) valid: bool,
    pub(crate) reverse: Option<EdgeHandle>,
    pub(crate) traveling: u32,
}

impl Edge {
    /// Returns the stable id of this edge.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Returns the source node.
    #[must_use]
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Returns the destination node.
    #[must_use]
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Indicates whether the edge has been validated since the last
    /// revalidation pass.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    ///
    /// Returns the handle of the edge in the opposite direction, if the two
    /// directions have been paired.
    ///
    #[must_use]
    pub fn reverse(&self) -> Option<EdgeHandle> {
        self.reverse
    }

    /// Returns the number of packets currently traveling on this edge.
    #[must_use]
    pub fn traveling(&self) -> u32 {
        self.traveling
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Edge {} {} -> {} ({})",
            self.id,
            self.start,
            self.end,
            if self.valid { "valid" } else { "invalid" }
        )
    }
}
