//! Bounded local search deciding whether a shortcut is needed

use butterfly_common::Result;

use crate::routing::dijkstra::Frontier;
use crate::routing::{EdgeFilter, WeightCalculation};
use crate::storage::{Graph, NodeId};

/// Dijkstra from one in-neighbour of the node being contracted, avoiding that
/// node and everything already contracted
#[derive(Debug)]
pub(crate) struct WitnessSearch {
    frontier: Frontier,
    settled_limit: usize,
}

impl WitnessSearch {
    pub fn new(settled_limit: usize) -> Self {
        Self {
            frontier: Frontier::default(),
            settled_limit: settled_limit.max(1),
        }
    }

    /// Explore from `source` until `max_weight` is exceeded or the settled
    /// limit is hit. Weights found afterwards are upper bounds of real paths.
    #[allow(clippy::too_many_arguments)]
    pub fn run<G: Graph + ?Sized>(
        &mut self,
        graph: &G,
        weighting: &WeightCalculation,
        filter: &EdgeFilter,
        contracted: &[bool],
        source: NodeId,
        avoid: NodeId,
        max_weight: f64,
    ) -> Result<()> {
        self.frontier.clear();
        self.frontier.start(source);

        let mut settled = 0;
        while let Some(top) = self.frontier.peek_weight() {
            if top > max_weight || settled >= self.settled_limit {
                break;
            }
            let Some((node, weight)) = self.frontier.pop() else {
                break;
            };
            settled += 1;

            for view in graph.edges_filtered(node, filter)? {
                let adj = view.adj_node();
                if adj == avoid || contracted[adj as usize] || self.frontier.is_settled(adj) {
                    continue;
                }
                let edge_weight = weighting.weight(&view)?;
                if edge_weight.is_infinite() {
                    continue;
                }
                self.frontier.relax(adj, node, view.edge(), weight + edge_weight);
            }
        }
        Ok(())
    }

    /// Best weight found to `target`, `f64::INFINITY` if unreached
    pub fn weight_to(&self, target: NodeId) -> f64 {
        self.frontier
            .entry(target)
            .map_or(f64::INFINITY, |e| e.weight)
    }

    /// Edge used to reach `target`, `NO_EDGE` if unreached
    #[cfg(test)]
    pub fn edge_to(&self, target: NodeId) -> u32 {
        self.frontier.entry(target).map_or(crate::storage::NO_EDGE, |e| e.edge)
    }
}
