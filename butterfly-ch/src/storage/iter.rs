//! Edge views and the iterators handing them out

use std::fmt;

use super::graph_storage::{raw_to_distance, GraphStorage};
use super::{EdgeId, NodeId, NO_EDGE};
use crate::flags::EdgeFlags;
use crate::routing::filter::EdgeFilter;

/// One edge seen from `base_node`; flags are oriented accordingly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeView {
    edge: EdgeId,
    base_node: NodeId,
    adj_node: NodeId,
    raw_distance: u32,
    /// `f64` bits of an exact shortcut weight
    exact_weight: Option<u64>,
    flags: EdgeFlags,
}

impl EdgeView {
    pub(crate) fn new(
        edge: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
        raw_distance: u32,
        flags: EdgeFlags,
    ) -> Self {
        Self {
            edge,
            base_node,
            adj_node,
            raw_distance,
            exact_weight: None,
            flags,
        }
    }

    pub(crate) fn with_exact_weight(mut self, weight: Option<f64>) -> Self {
        self.exact_weight = weight.map(f64::to_bits);
        self
    }

    #[inline]
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    #[inline]
    pub fn base_node(&self) -> NodeId {
        self.base_node
    }

    #[inline]
    pub fn adj_node(&self) -> NodeId {
        self.adj_node
    }

    /// Stored distance; for shortcuts the exact summed weight when available
    #[inline]
    pub fn distance(&self) -> f64 {
        match self.exact_weight {
            Some(bits) => f64::from_bits(bits),
            None => raw_to_distance(self.raw_distance),
        }
    }

    /// Distance in fixed point (thousandths)
    #[inline]
    pub fn raw_distance(&self) -> u32 {
        self.raw_distance
    }

    #[inline]
    pub fn flags(&self) -> EdgeFlags {
        self.flags
    }
}

impl fmt::Display for EdgeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edge {}: {} -> {} ({:.3}, {})",
            self.edge,
            self.base_node,
            self.adj_node,
            self.distance(),
            self.flags
        )
    }
}

/// Walks one node's adjacency list, yielding edges accepted by the filter
pub struct EdgeIterator<'a> {
    storage: &'a GraphStorage,
    base_node: NodeId,
    next_edge: EdgeId,
    filter: &'a EdgeFilter,
}

impl<'a> EdgeIterator<'a> {
    pub(crate) fn new(
        storage: &'a GraphStorage,
        base_node: NodeId,
        first_edge: EdgeId,
        filter: &'a EdgeFilter,
    ) -> Self {
        Self {
            storage,
            base_node,
            next_edge: first_edge,
            filter,
        }
    }

    pub fn base_node(&self) -> NodeId {
        self.base_node
    }
}

impl Iterator for EdgeIterator<'_> {
    type Item = EdgeView;

    fn next(&mut self) -> Option<EdgeView> {
        while self.next_edge != NO_EDGE {
            let edge = self.next_edge;
            let s = self.storage;

            let (adj_node, next, flags) = if s.node_a(edge) == self.base_node {
                (s.node_b(edge), s.link_a(edge), s.raw_flags(edge))
            } else {
                (
                    s.node_a(edge),
                    s.link_b(edge),
                    s.raw_flags(edge).swap_direction(),
                )
            };
            self.next_edge = next;

            if self.filter.accept(flags) {
                return Some(
                    EdgeView::new(edge, self.base_node, adj_node, s.raw_distance(edge), flags)
                        .with_exact_weight(s.shortcut_weight(edge, flags)),
                );
            }
        }
        None
    }
}

/// Scans the edge table in index order, views oriented node_a → node_b
pub struct AllEdgesIterator<'a> {
    storage: &'a GraphStorage,
    next_edge: usize,
}

impl<'a> AllEdgesIterator<'a> {
    pub(crate) fn new(storage: &'a GraphStorage) -> Self {
        Self {
            storage,
            next_edge: 0,
        }
    }
}

impl Iterator for AllEdgesIterator<'_> {
    type Item = EdgeView;

    fn next(&mut self) -> Option<EdgeView> {
        if self.next_edge >= self.storage.edge_count() {
            return None;
        }
        let edge = self.next_edge as EdgeId;
        self.next_edge += 1;
        Some(self.storage.view(edge))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.storage.edge_count().saturating_sub(self.next_edge);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AllEdgesIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Directory, Graph};

    #[test]
    fn test_view_display() {
        let view = EdgeView::new(3, 0, 1, 5000, EdgeFlags::default_flags(false));
        assert_eq!(view.to_string(), "edge 3: 0 -> 1 (5.000, -> car bike foot 50km/h)");
    }

    #[test]
    fn test_iterator_is_restartable_per_call() {
        let mut g = GraphStorage::new(Directory::ram());
        g.create_new(3).unwrap();
        g.edge(0, 1, 1.0, true).unwrap();
        g.edge(0, 2, 1.0, true).unwrap();

        let mut it = g.get_edges(0).unwrap();
        assert_eq!(it.base_node(), 0);
        assert!(it.next().is_some());
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());

        assert_eq!(g.get_edges(0).unwrap().count(), 2);
        assert_eq!(g.get_all_edges().len(), 2);
    }

    #[test]
    fn test_custom_filter_on_iterator() {
        let mut g = GraphStorage::new(Directory::ram());
        g.create_new(3).unwrap();
        g.edge_with_flags(0, 1, 1.0, EdgeFlags::new(&[crate::flags::Mode::Car], 100, true, true))
            .unwrap();
        g.edge_with_flags(0, 2, 1.0, EdgeFlags::new(&[crate::flags::Mode::Car], 30, true, true))
            .unwrap();

        let fast = EdgeFilter::custom(|flags| flags.speed_kmh() > 50);
        let adj: Vec<_> = g
            .edges_filtered(0, &fast)
            .unwrap()
            .map(|e| e.adj_node())
            .collect();
        assert_eq!(adj, vec![1]);
    }
}
