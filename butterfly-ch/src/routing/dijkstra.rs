//! Unidirectional Dijkstra and the search frontier shared by all searches

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use butterfly_common::{Error, Result};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::filter::EdgeFilter;
use super::path::{Hop, Path, PathBuilder};
use super::weighting::WeightCalculation;
use super::{RoutingAlgorithm, SearchState};
use crate::flags::Mode;
use crate::storage::{EdgeId, Graph, NodeId, NO_EDGE};

/// Parent of a search root
pub(crate) const NO_NODE: NodeId = u32::MAX;

/// Best known way to reach a node
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeEntry {
    pub edge: EdgeId,
    pub parent: NodeId,
    pub weight: f64,
    pub settled: bool,
}

/// Heap item; min-heap by weight, ties by discovery order
#[derive(Debug, Clone, Copy)]
struct QueueItem {
    weight: f64,
    seq: u64,
    node: NodeId,
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

/// Visited nodes and the priority queue of one search direction.
/// Stale queue items are skipped on pop.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    entries: FxHashMap<NodeId, EdgeEntry>,
    heap: BinaryHeap<QueueItem>,
    seq: u64,
    settled: usize,
}

impl Frontier {
    pub fn clear(&mut self) {
        self.entries.clear();
        self.heap.clear();
        self.seq = 0;
        self.settled = 0;
    }

    pub fn start(&mut self, root: NodeId) {
        self.entries.insert(
            root,
            EdgeEntry {
                edge: NO_EDGE,
                parent: NO_NODE,
                weight: 0.0,
                settled: false,
            },
        );
        self.push(root, 0.0);
    }

    fn push(&mut self, node: NodeId, weight: f64) {
        self.heap.push(QueueItem {
            weight,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    /// Record `node` at `weight` if strictly better than what is known
    pub fn relax(&mut self, node: NodeId, parent: NodeId, edge: EdgeId, weight: f64) -> bool {
        match self.entries.get_mut(&node) {
            Some(entry) if entry.settled || weight >= entry.weight => return false,
            Some(entry) => {
                entry.edge = edge;
                entry.parent = parent;
                entry.weight = weight;
            }
            None => {
                self.entries.insert(
                    node,
                    EdgeEntry {
                        edge,
                        parent,
                        weight,
                        settled: false,
                    },
                );
            }
        }
        self.push(node, weight);
        true
    }

    fn discard_stale(&mut self) {
        while let Some(top) = self.heap.peek() {
            match self.entries.get(&top.node) {
                Some(entry) if !entry.settled && entry.weight == top.weight => return,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }

    /// Weight of the next node to settle
    pub fn peek_weight(&mut self) -> Option<f64> {
        self.discard_stale();
        self.heap.peek().map(|item| item.weight)
    }

    /// Settle and return the closest unsettled node
    pub fn pop(&mut self) -> Option<(NodeId, f64)> {
        self.discard_stale();
        let item = self.heap.pop()?;
        if let Some(entry) = self.entries.get_mut(&item.node) {
            entry.settled = true;
        }
        self.settled += 1;
        Some((item.node, item.weight))
    }

    pub fn entry(&self, node: NodeId) -> Option<&EdgeEntry> {
        self.entries.get(&node)
    }

    pub fn is_settled(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|e| e.settled)
    }

    pub fn settled_count(&self) -> usize {
        self.settled
    }

    /// Hops from the root to `node`, in travel order
    pub fn hops_to(&self, node: NodeId) -> Vec<Hop> {
        let mut hops = Vec::new();
        let mut current = node;
        while let Some(entry) = self.entries.get(&current) {
            if entry.parent == NO_NODE {
                break;
            }
            hops.push(Hop {
                edge: entry.edge,
                from: entry.parent,
                to: current,
            });
            current = entry.parent;
        }
        hops.reverse();
        hops
    }

    /// Hops from `node` back to the root of a backward search, in travel order
    pub fn hops_from(&self, node: NodeId) -> Vec<Hop> {
        let mut hops = Vec::new();
        let mut current = node;
        while let Some(entry) = self.entries.get(&current) {
            if entry.parent == NO_NODE {
                break;
            }
            hops.push(Hop {
                edge: entry.edge,
                from: current,
                to: entry.parent,
            });
            current = entry.parent;
        }
        hops
    }
}

/// Plain Dijkstra over outgoing edges
pub struct Dijkstra<'a, G: Graph + ?Sized> {
    graph: &'a G,
    weighting: WeightCalculation,
    mode: Option<Mode>,
    additional: Option<EdgeFilter>,
    out_filter: EdgeFilter,
    frontier: Frontier,
    state: SearchState,
}

impl<'a, G: Graph + ?Sized> Dijkstra<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        let mut algo = Self {
            graph,
            weighting: WeightCalculation::Shortest,
            mode: None,
            additional: None,
            out_filter: EdgeFilter::outgoing().clone(),
            frontier: Frontier::default(),
            state: SearchState::Init,
        };
        algo.rebuild_filters();
        algo
    }

    pub fn with_weighting(mut self, weighting: WeightCalculation) -> Self {
        self.weighting = weighting;
        self
    }

    /// Only traverse edges open to `mode`
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self.rebuild_filters();
        self
    }

    /// Extra restriction AND-ed with the direction and mode filter
    pub fn with_additional_filter(mut self, filter: EdgeFilter) -> Self {
        self.additional = Some(filter);
        self.rebuild_filters();
        self
    }

    fn rebuild_filters(&mut self) {
        let base = EdgeFilter::Access {
            mode: self.mode,
            incoming: false,
            outgoing: true,
        }
        .and(EdgeFilter::Original);
        self.out_filter = match &self.additional {
            Some(extra) => base.and(extra.clone()),
            None => base,
        };
    }

    fn search(&mut self, from: NodeId, to: NodeId) -> Result<Option<f64>> {
        self.frontier.start(from);
        while let Some((node, weight)) = self.frontier.pop() {
            if node == to {
                return Ok(Some(weight));
            }
            for view in self.graph.edges_filtered(node, &self.out_filter)? {
                let adj = view.adj_node();
                if self.frontier.is_settled(adj) {
                    continue;
                }
                let edge_weight = self.weighting.weight(&view)?;
                if edge_weight.is_infinite() {
                    continue;
                }
                self.frontier
                    .relax(adj, node, view.edge(), weight + edge_weight);
            }
        }
        Ok(None)
    }
}

impl<G: Graph + ?Sized> RoutingAlgorithm for Dijkstra<'_, G> {
    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Result<Path> {
        if self.state != SearchState::Init {
            return Err(Error::AlgorithmAlreadyUsed(self.name().to_string()));
        }
        self.graph.storage().check_node(from)?;
        self.graph.storage().check_node(to)?;
        self.state = SearchState::Running;

        let Some(weight) = self.search(from, to)? else {
            self.state = SearchState::Exhausted;
            debug!(from, to, visited = self.visited_nodes(), "Dijkstra: no path");
            return Ok(Path::not_found());
        };

        self.state = SearchState::Found;
        let hops = self.frontier.hops_to(to);
        let path = PathBuilder::new(self.graph, &self.weighting, &self.out_filter)
            .build(from, &hops)?;
        debug!(
            from,
            to,
            weight,
            visited = self.visited_nodes(),
            "Dijkstra: path found"
        );
        Ok(path)
    }

    fn clear(&mut self) {
        self.frontier.clear();
        self.state = SearchState::Init;
    }

    fn state(&self) -> SearchState {
        self.state
    }

    fn visited_nodes(&self) -> usize {
        self.frontier.settled_count()
    }

    fn name(&self) -> &'static str {
        "dijkstra"
    }
}
