//! Query over a contracted graph: bidirectional Dijkstra that only relaxes
//! edges leading to higher-level nodes

use butterfly_common::{Error, Result};

use crate::flags::Mode;
use crate::routing::{
    DijkstraBidirection, EdgeFilter, Path, RoutingAlgorithm, SearchState, WeightCalculation,
};
use crate::storage::{LevelGraph, NodeId, UNCONTRACTED};

pub struct DijkstraBidirectionCh<'a, G: LevelGraph + ?Sized> {
    inner: DijkstraBidirection<'a, G>,
}

impl<'a, G: LevelGraph + ?Sized> DijkstraBidirectionCh<'a, G> {
    /// Fails with `Error::NotPrepared` unless every node has a level
    pub fn new(graph: &'a G) -> Result<Self> {
        for node in 0..graph.node_count() as NodeId {
            if graph.level(node)? == UNCONTRACTED {
                return Err(Error::NotPrepared);
            }
        }
        Ok(Self {
            inner: DijkstraBidirection::new(graph).named("ch").with_shortcuts(),
        })
    }

    /// Must match the mode the graph was prepared for
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.inner = self.inner.with_mode(mode);
        self
    }

    /// Must match the weighting the graph was prepared with
    pub fn with_weighting(mut self, weighting: WeightCalculation) -> Self {
        self.inner = self.inner.with_weighting(weighting);
        self
    }

    /// Applies to shortcuts while searching and to their sub-edges while
    /// unrolling
    pub fn with_additional_filter(mut self, filter: EdgeFilter) -> Self {
        self.inner = self.inner.with_additional_filter(filter);
        self
    }
}

impl<G: LevelGraph + ?Sized> RoutingAlgorithm for DijkstraBidirectionCh<'_, G> {
    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Result<Path> {
        let graph = self.inner.graph();
        self.inner.calc_path_with(from, to, |view| {
            Ok(graph.level(view.adj_node())? > graph.level(view.base_node())?)
        })
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn state(&self) -> SearchState {
        self.inner.state()
    }

    fn visited_nodes(&self) -> usize {
        self.inner.visited_nodes()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
