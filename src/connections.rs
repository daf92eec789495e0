//! The per-node collection of outgoing edges.

use crate::edge::{Edge, EdgeHandle};
use crate::node::NodeId;
use crate::util::Arena;
use fxhash::FxHashMap;
use rand::seq::SliceRandom;
use rand::RngCore;

///
/// The ordered collection of a node's outgoing edges.
///
/// Entries are kept in a vector (iteration order matters for neighbor
/// processing) with a hash index from destination node to position, giving
/// O(1) insertion, lookup and removal. At most one edge exists per ordered
/// `(start, end)` pair.
///
/// The collection is the site of the **revalidation protocol**: after every
/// [`remove_invalid_links`](Connections::remove_invalid_links) pass each
/// surviving edge is invalid again, and survives the next pass only if the
/// connectivity model re-validates it in between.
///
#[derive(Debug, Default)]
pub struct Connections {
    entries: Vec<(NodeId, EdgeHandle)>,
    index: FxHashMap<NodeId, usize>,
}

impl Connections {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of outgoing edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indicates whether the node has no outgoing edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the outgoing edge handles in collection order.
    pub fn iter(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.entries.iter().map(|&(_, handle)| handle)
    }

    /// Iterates over the destination nodes in collection order.
    pub fn endpoints(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|&(end, _)| end)
    }

    /// Returns the handle of the edge towards `to`, if one exists.
    #[must_use]
    pub fn get(&self, to: NodeId) -> Option<EdgeHandle> {
        self.index.get(&to).map(|&pos| self.entries[pos].1)
    }

    ///
    /// Inserts an edge towards `to`. The caller must have checked that no
    /// such edge exists; the create-or-revalidate semantics live in
    /// [`World::add_edge`](crate::world::World::add_edge).
    ///
    pub(crate) fn insert(&mut self, to: NodeId, handle: EdgeHandle) {
        debug_assert!(!self.index.contains_key(&to), "duplicate edge to {to}");
        self.index.insert(to, self.entries.len());
        self.entries.push((to, handle));
    }

    ///
    /// Detaches and returns the edge towards `to` without freeing it;
    /// freeing is the caller's responsibility.
    ///
    pub(crate) fn remove(&mut self, to: NodeId) -> Option<EdgeHandle> {
        let pos = self.index.remove(&to)?;
        let (_, handle) = self.entries.swap_remove(pos);
        if let Some(&(moved_end, _)) = self.entries.get(pos) {
            self.index.insert(moved_end, pos);
        }
        Some(handle)
    }

    ///
    /// Runs one revalidation pass: frees every edge whose `valid` flag is
    /// unset and resets the flag of every survivor to invalid. Returns the
    /// number of edges removed.
    ///
    /// Reverse pairings of removed edges are unlinked on the partner edge.
    /// Packets still traveling on a removed edge are not touched here; their
    /// dangling edge handle marks them undeliverable when the receiver's
    /// buffer is next scanned.
    ///
    pub(crate) fn remove_invalid_links(&mut self, edges: &mut Arena<Edge>) -> usize {
        let before = self.entries.len();
        let mut kept = Vec::with_capacity(before);
        for (end, handle) in self.entries.drain(..) {
            let edge = edges.get_mut(handle).expect("edge collection out of sync");
            if edge.valid {
                edge.valid = false;
                kept.push((end, handle));
            } else {
                let reverse = edge.reverse;
                edges.free(handle);
                if let Some(partner) = reverse.and_then(|r| edges.get_mut(r)) {
                    partner.reverse = None;
                }
            }
        }
        self.entries = kept;
        self.rebuild_index();
        before - self.entries.len()
    }

    ///
    /// Reorders the entries uniformly at random, to avoid positional bias
    /// when iterating neighbors.
    ///
    pub(crate) fn random_permutation(&mut self, rng: &mut dyn RngCore) {
        self.entries.shuffle(rng);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, &(end, _)) in self.entries.iter().enumerate() {
            self.index.insert(end, pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeId;

    fn edge(arena: &mut Arena<Edge>, id: u64, start: u64, end: u64, valid: bool) -> EdgeHandle {
        arena.alloc(Edge {
            id: EdgeId(id),
            start: NodeId(start),
            end: NodeId(end),
            valid,
            reverse: None,
            traveling: 0,
        })
    }

    #[test]
    fn insert_lookup_remove() {
        let mut arena = Arena::new();
        let mut conns = Connections::new();
        let h1 = edge(&mut arena, 0, 1, 2, true);
        let h2 = edge(&mut arena, 1, 1, 3, true);
        conns.insert(NodeId(2), h1);
        conns.insert(NodeId(3), h2);

        assert_eq!(conns.len(), 2);
        assert_eq!(conns.get(NodeId(2)), Some(h1));
        assert_eq!(conns.get(NodeId(3)), Some(h2));

        assert_eq!(conns.remove(NodeId(2)), Some(h1));
        assert_eq!(conns.get(NodeId(2)), None);
        // The swapped-in entry must still be indexed.
        assert_eq!(conns.get(NodeId(3)), Some(h2));
        assert_eq!(conns.remove(NodeId(2)), None);
    }

    #[test]
    fn revalidation_deletes_invalid_and_resets_survivors() {
        let mut arena = Arena::new();
        let mut conns = Connections::new();
        let valid = edge(&mut arena, 0, 1, 2, true);
        let invalid = edge(&mut arena, 1, 1, 3, false);
        conns.insert(NodeId(2), valid);
        conns.insert(NodeId(3), invalid);

        assert_eq!(conns.remove_invalid_links(&mut arena), 1);
        assert_eq!(conns.len(), 1);
        assert!(!arena.contains(invalid));
        // The survivor is invalid again until the model re-validates it.
        assert!(!arena.get(valid).unwrap().valid);

        // A second pass with no intervening add removes the rest.
        assert_eq!(conns.remove_invalid_links(&mut arena), 1);
        assert!(conns.is_empty());
        assert_eq!(conns.remove_invalid_links(&mut arena), 0);
    }

    #[test]
    fn permutation_keeps_index_consistent() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut arena = Arena::new();
        let mut conns = Connections::new();
        let mut handles = Vec::new();
        for i in 0..16u64 {
            let h = edge(&mut arena, i, 0, i + 1, true);
            conns.insert(NodeId(i + 1), h);
            handles.push((NodeId(i + 1), h));
        }

        let mut rng = StdRng::seed_from_u64(42);
        conns.random_permutation(&mut rng);

        assert_eq!(conns.len(), 16);
        for (end, h) in handles {
            assert_eq!(conns.get(end), Some(h));
        }
    }
}
