//! Bidirectional Dijkstra
//!
//! A forward search from the source over outgoing edges and a backward search
//! from the target over incoming edges. The side whose queue minimum is
//! smaller advances; the best meeting weight is updated whenever a node is
//! reached by one side and already known to the other. The search ends once
//! both queue minima reach the best meeting weight.
//!
//! The expansion loop takes an edge acceptance predicate so the CH query can
//! reuse it with its upward-only restriction.

use butterfly_common::{Error, Result};
use tracing::debug;

use super::dijkstra::Frontier;
use super::filter::EdgeFilter;
use super::path::{Path, PathBuilder};
use super::weighting::WeightCalculation;
use super::{RoutingAlgorithm, SearchState};
use crate::flags::Mode;
use crate::storage::{EdgeView, Graph, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Forward,
    Backward,
}

/// Bidirectional Dijkstra over a plain graph
pub struct DijkstraBidirection<'a, G: Graph + ?Sized> {
    graph: &'a G,
    weighting: WeightCalculation,
    mode: Option<Mode>,
    additional: Option<EdgeFilter>,
    out_filter: EdgeFilter,
    in_filter: EdgeFilter,
    shortcuts: bool,
    fwd: Frontier,
    bwd: Frontier,
    best_weight: f64,
    meeting: Option<NodeId>,
    state: SearchState,
    name: &'static str,
}

impl<'a, G: Graph + ?Sized> DijkstraBidirection<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        let mut algo = Self {
            graph,
            weighting: WeightCalculation::Shortest,
            mode: None,
            additional: None,
            out_filter: EdgeFilter::outgoing().clone(),
            in_filter: EdgeFilter::incoming().clone(),
            shortcuts: false,
            fwd: Frontier::default(),
            bwd: Frontier::default(),
            best_weight: f64::INFINITY,
            meeting: None,
            state: SearchState::Init,
            name: "bidijkstra",
        };
        algo.rebuild_filters();
        algo
    }

    pub(crate) fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Relax shortcut edges too; only meaningful on a contracted graph
    pub(crate) fn with_shortcuts(mut self) -> Self {
        self.shortcuts = true;
        self.rebuild_filters();
        self
    }

    pub fn with_weighting(mut self, weighting: WeightCalculation) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self.rebuild_filters();
        self
    }

    pub fn with_additional_filter(mut self, filter: EdgeFilter) -> Self {
        self.additional = Some(filter);
        self.rebuild_filters();
        self
    }

    pub(crate) fn graph(&self) -> &'a G {
        self.graph
    }

    fn rebuild_filters(&mut self) {
        let mut out = EdgeFilter::Access {
            mode: self.mode,
            incoming: false,
            outgoing: true,
        };
        let mut inc = EdgeFilter::Access {
            mode: self.mode,
            incoming: true,
            outgoing: false,
        };
        if !self.shortcuts {
            out = out.and(EdgeFilter::Original);
            inc = inc.and(EdgeFilter::Original);
        }
        match &self.additional {
            Some(extra) => {
                self.out_filter = out.and(extra.clone());
                self.in_filter = inc.and(extra.clone());
            }
            None => {
                self.out_filter = out;
                self.in_filter = inc;
            }
        }
    }

    /// Run the search, relaxing only edges for which `accept` holds
    pub(crate) fn calc_path_with<F>(&mut self, from: NodeId, to: NodeId, accept: F) -> Result<Path>
    where
        F: Fn(&EdgeView) -> Result<bool>,
    {
        if self.state != SearchState::Init {
            return Err(Error::AlgorithmAlreadyUsed(self.name.to_string()));
        }
        self.graph.storage().check_node(from)?;
        self.graph.storage().check_node(to)?;
        self.state = SearchState::Running;

        self.fwd.start(from);
        self.bwd.start(to);
        if from == to {
            self.best_weight = 0.0;
            self.meeting = Some(from);
        }

        loop {
            let top_fwd = self.fwd.peek_weight().unwrap_or(f64::INFINITY);
            let top_bwd = self.bwd.peek_weight().unwrap_or(f64::INFINITY);
            let min = top_fwd.min(top_bwd);
            if min.is_infinite() || min >= self.best_weight {
                break;
            }
            let side = if top_fwd <= top_bwd {
                Side::Forward
            } else {
                Side::Backward
            };
            self.expand(side, &accept)?;
        }

        let Some(meeting) = self.meeting else {
            self.state = SearchState::Exhausted;
            debug!(from, to, visited = self.visited(), algo = self.name, "No path");
            return Ok(Path::not_found());
        };

        self.state = SearchState::Found;
        let mut hops = self.fwd.hops_to(meeting);
        hops.extend(self.bwd.hops_from(meeting));
        let path = PathBuilder::new(self.graph, &self.weighting, &self.out_filter)
            .build(from, &hops)?;
        debug!(
            from,
            to,
            meeting,
            weight = self.best_weight,
            visited = self.visited(),
            algo = self.name,
            "Path found"
        );
        Ok(path)
    }

    fn expand<F>(&mut self, side: Side, accept: &F) -> Result<()>
    where
        F: Fn(&EdgeView) -> Result<bool>,
    {
        let (this, other, filter) = match side {
            Side::Forward => (&mut self.fwd, &self.bwd, &self.out_filter),
            Side::Backward => (&mut self.bwd, &self.fwd, &self.in_filter),
        };
        let Some((node, weight)) = this.pop() else {
            return Ok(());
        };

        if let Some(entry) = other.entry(node) {
            let total = weight + entry.weight;
            if total < self.best_weight {
                self.best_weight = total;
                self.meeting = Some(node);
            }
        }

        for view in self.graph.edges_filtered(node, filter)? {
            let adj = view.adj_node();
            if this.is_settled(adj) || !accept(&view)? {
                continue;
            }
            // backward edges are traversed adj -> node
            let flags = match side {
                Side::Forward => view.flags(),
                Side::Backward => view.flags().swap_direction(),
            };
            let edge_weight = self.weighting.calc_weight(view.distance(), flags)?;
            if edge_weight.is_infinite() {
                continue;
            }
            let tentative = weight + edge_weight;
            if !this.relax(adj, node, view.edge(), tentative) {
                continue;
            }
            if let Some(entry) = other.entry(adj) {
                let total = tentative + entry.weight;
                if total < self.best_weight {
                    self.best_weight = total;
                    self.meeting = Some(adj);
                }
            }
        }
        Ok(())
    }

    fn visited(&self) -> usize {
        self.fwd.settled_count() + self.bwd.settled_count()
    }
}

impl<G: Graph + ?Sized> RoutingAlgorithm for DijkstraBidirection<'_, G> {
    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Result<Path> {
        self.calc_path_with(from, to, |_| Ok(true))
    }

    fn clear(&mut self) {
        self.fwd.clear();
        self.bwd.clear();
        self.best_weight = f64::INFINITY;
        self.meeting = None;
        self.state = SearchState::Init;
    }

    fn state(&self) -> SearchState {
        self.state
    }

    fn visited_nodes(&self) -> usize {
        self.visited()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
