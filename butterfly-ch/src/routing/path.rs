//! Search results and their construction from predecessor chains
//!
//! Shortcut edges are always unrolled: a shortcut `from → to` skipping edge
//! `s` passes through the endpoint of `s` that is neither `from` nor `to`.
//! The cheapest edge `from → via` and `via → to` (preferring `s` on ties)
//! replace it, and each is unrolled in turn until only original edges remain.

use std::fmt;

use butterfly_common::{Error, Result};
use tracing::trace;

use super::filter::EdgeFilter;
use super::weighting::WeightCalculation;
use crate::storage::{EdgeId, EdgeView, Graph, NodeId, NO_EDGE};

/// Result of a point-to-point search
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    found: bool,
    weight: f64,
    distance: f64,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
}

impl Path {
    pub fn not_found() -> Self {
        Self {
            found: false,
            weight: f64::INFINITY,
            distance: 0.0,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    /// Sum of edge weights under the search's weighting
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Sum of original edge distances
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Original (non-shortcut) edges in travel order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.found {
            return f.write_str("no path");
        }
        let nodes: Vec<String> = self.nodes.iter().map(|n| n.to_string()).collect();
        write!(
            f,
            "{} (weight {:.3}, distance {:.3})",
            nodes.join(" -> "),
            self.weight,
            self.distance
        )
    }
}

/// One traversed edge of a predecessor chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hop {
    pub edge: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
}

/// Turns hop chains into paths, expanding shortcuts on the way
pub(crate) struct PathBuilder<'a, G: Graph + ?Sized> {
    graph: &'a G,
    weighting: &'a WeightCalculation,
    filter: &'a EdgeFilter,
}

impl<'a, G: Graph + ?Sized> PathBuilder<'a, G> {
    /// `filter` selects candidate sub-edges when unrolling; it must accept
    /// edges traversable from the base node
    pub fn new(graph: &'a G, weighting: &'a WeightCalculation, filter: &'a EdgeFilter) -> Self {
        Self {
            graph,
            weighting,
            filter,
        }
    }

    /// The path's weight is summed over the unrolled original edges
    pub fn build(&self, start: NodeId, hops: &[Hop]) -> Result<Path> {
        let mut path = Path {
            found: true,
            weight: 0.0,
            distance: 0.0,
            nodes: vec![start],
            edges: Vec::with_capacity(hops.len()),
        };
        for hop in hops {
            self.append(&mut path, *hop)?;
        }
        Ok(path)
    }

    fn append(&self, path: &mut Path, hop: Hop) -> Result<()> {
        let mut stack = vec![hop];
        while let Some(hop) = stack.pop() {
            let view = self.graph.edge_props(hop.edge, hop.to)?;
            if !view.flags().is_shortcut() {
                path.weight += self.weighting.weight(&view)?;
                path.distance += view.distance();
                path.edges.push(hop.edge);
                path.nodes.push(hop.to);
                continue;
            }

            let (first, second) = self.expand(hop)?;
            trace!(
                shortcut = hop.edge,
                from = hop.from,
                to = hop.to,
                first = first.edge,
                second = second.edge,
                "Unrolled shortcut"
            );
            stack.push(second);
            stack.push(first);
        }
        Ok(())
    }

    fn expand(&self, hop: Hop) -> Result<(Hop, Hop)> {
        let skipped = self.graph.skipped_edge(hop.edge);
        if skipped == NO_EDGE {
            return Err(unrecoverable(hop.edge, "no skipped edge recorded"));
        }

        let storage = self.graph.storage();
        storage.check_edge(skipped)?;
        let a = storage.node_a(skipped);
        let b = storage.node_b(skipped);
        let via = if a != hop.from && a != hop.to {
            a
        } else if b != hop.from && b != hop.to {
            b
        } else {
            return Err(unrecoverable(
                hop.edge,
                &format!("skipped edge {skipped} does not leave the shortcut's endpoints"),
            ));
        };

        let first = self
            .cheapest_edge(hop.from, via, skipped)?
            .ok_or_else(|| unrecoverable(hop.edge, &format!("no edge {} -> {via}", hop.from)))?;
        let second = self
            .cheapest_edge(via, hop.to, skipped)?
            .ok_or_else(|| unrecoverable(hop.edge, &format!("no edge {via} -> {}", hop.to)))?;

        Ok((
            Hop {
                edge: first.edge(),
                from: hop.from,
                to: via,
            },
            Hop {
                edge: second.edge(),
                from: via,
                to: hop.to,
            },
        ))
    }

    fn cheapest_edge(&self, from: NodeId, to: NodeId, prefer: EdgeId) -> Result<Option<EdgeView>> {
        let mut best: Option<(f64, bool, EdgeView)> = None;
        for view in self.graph.edges_filtered(from, self.filter)? {
            if view.adj_node() != to {
                continue;
            }
            let weight = self.weighting.weight(&view)?;
            let preferred = view.edge() == prefer;
            let better = match &best {
                None => true,
                Some((w, p, _)) => weight < *w || (weight == *w && preferred && !p),
            };
            if better {
                best = Some((weight, preferred, view));
            }
        }
        Ok(best.map(|(_, _, view)| view))
    }
}

fn unrecoverable(edge: EdgeId, reason: &str) -> Error {
    Error::UnrecoverableShortcut {
        edge,
        reason: reason.to_string(),
    }
}
