//! Contraction Hierarchies preprocessing
//!
//! Nodes are contracted in priority order. The priority of a node is
//!
//!   edge_difference_weight * (shortcuts needed - edges removed)
//!     + contracted_neighbours_weight * contracted neighbours
//!
//! and is updated lazily: a popped node whose recomputed priority is worse
//! than the next candidate goes back into the queue. Contracting `v` adds a
//! shortcut `u → w` for every in-neighbour `u` and out-neighbour `w` unless a
//! witness path avoiding `v` is at most as heavy. Each contracted node
//! receives the next level.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use butterfly_common::{Error, Result};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::query::DijkstraBidirectionCh;
use super::witness::WitnessSearch;
use crate::config::PrepareConfig;
use crate::flags::{EdgeFlags, Mode};
use crate::routing::{AlgorithmPreparation, EdgeFilter, RoutingAlgorithm, WeightCalculation};
use crate::storage::{EdgeId, LevelGraph, NodeId, UNCONTRACTED};

/// Summary of one preparation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareStats {
    pub nodes: usize,
    pub original_edges: usize,
    pub shortcuts: usize,
    pub lazy_updates: usize,
    pub elapsed_ms: u64,
}

/// Cheapest edge to or from one neighbour
#[derive(Debug, Clone, Copy)]
struct NeighbourEdge {
    edge: EdgeId,
    weight: f64,
}

#[derive(Debug, Clone, Copy)]
struct Shortcut {
    from: NodeId,
    to: NodeId,
    weight: f64,
    skipped: EdgeId,
    both: bool,
}

/// Contracts a level graph in place for one mode and weighting
pub struct PrepareContractionHierarchies<'a, G: LevelGraph + ?Sized> {
    graph: &'a mut G,
    config: PrepareConfig,
    mode: Mode,
    weighting: WeightCalculation,
    out_filter: EdgeFilter,
    in_filter: EdgeFilter,
    prepared: bool,
    stats: PrepareStats,
}

impl<'a, G: LevelGraph + ?Sized> PrepareContractionHierarchies<'a, G> {
    pub fn new(graph: &'a mut G) -> Self {
        let mode = Mode::Car;
        Self {
            graph,
            config: PrepareConfig::default(),
            mode,
            weighting: WeightCalculation::Shortest,
            out_filter: access(mode, false, true),
            in_filter: access(mode, true, false),
            prepared: false,
            stats: PrepareStats::default(),
        }
    }

    pub fn with_config(mut self, config: PrepareConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self.out_filter = access(mode, false, true);
        self.in_filter = access(mode, true, false);
        self
    }

    pub fn with_weighting(mut self, weighting: WeightCalculation) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn stats(&self) -> &PrepareStats {
        &self.stats
    }

    pub fn graph(&self) -> &G {
        &*self.graph
    }

    fn leveled_nodes(&self) -> Result<usize> {
        let mut leveled = 0;
        for node in 0..self.graph.node_count() as NodeId {
            if self.graph.level(node)? != UNCONTRACTED {
                leveled += 1;
            }
        }
        Ok(leveled)
    }

    /// Contract every node. A no-op on a prepared graph.
    pub fn run(&mut self) -> Result<PrepareStats> {
        if self.is_prepared() {
            info!("Graph already prepared, skipping contraction");
            self.prepared = true;
            return Ok(self.stats.clone());
        }

        let node_count = self.graph.node_count();
        let leveled = self.leveled_nodes()?;
        if leveled > 0 {
            return Err(Error::PartiallyPrepared {
                leveled,
                node_count,
            });
        }

        let start = Instant::now();
        let original_edges = self.graph.edge_count();
        info!(
            nodes = node_count,
            edges = original_edges,
            mode = %self.mode,
            weighting = self.weighting.name(),
            "Starting Contraction Hierarchies preprocessing"
        );

        let mut contracted = vec![false; node_count];
        let mut contracted_neighbours = vec![0u32; node_count];
        let mut witness = WitnessSearch::new(self.config.witness_settled_limit);

        let mut queue = BinaryHeap::with_capacity(node_count);
        for node in 0..node_count as NodeId {
            let priority =
                self.priority(node, &contracted, &contracted_neighbours, &mut witness)?;
            queue.push(Reverse((priority, node)));
        }
        debug!(
            nodes = node_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Initial node priorities computed"
        );

        let mut next_level: u32 = 0;
        let mut shortcuts_added = 0usize;
        let mut lazy_updates = 0usize;
        let log_interval = self.config.log_interval.max(1);

        while let Some(Reverse((priority, node))) = queue.pop() {
            if contracted[node as usize] {
                continue;
            }

            let current =
                self.priority(node, &contracted, &contracted_neighbours, &mut witness)?;
            if current > priority {
                if let Some(Reverse((next, _))) = queue.peek() {
                    if current > *next {
                        lazy_updates += 1;
                        queue.push(Reverse((current, node)));
                        continue;
                    }
                }
            }

            let (ins, outs) = self.neighbours(node, &contracted)?;
            let shortcuts = self.find_shortcuts(node, &ins, &outs, &contracted, &mut witness)?;
            for sc in &shortcuts {
                let flags = EdgeFlags::shortcut(self.mode, true, sc.both);
                self.graph
                    .shortcut(sc.from, sc.to, sc.weight, flags, sc.skipped)?;
            }
            shortcuts_added += shortcuts.len();

            self.graph.set_level(node, next_level)?;
            next_level += 1;
            contracted[node as usize] = true;

            let mut touched: Vec<NodeId> = ins.keys().chain(outs.keys()).copied().collect();
            touched.sort_unstable();
            touched.dedup();
            for neighbour in touched {
                contracted_neighbours[neighbour as usize] += 1;
                let priority = self.priority(
                    neighbour,
                    &contracted,
                    &contracted_neighbours,
                    &mut witness,
                )?;
                queue.push(Reverse((priority, neighbour)));
            }

            if next_level as usize % log_interval == 0 {
                info!(
                    "Contracted {} / {} nodes ({:.1}%), shortcuts so far: {}",
                    next_level,
                    node_count,
                    100.0 * next_level as f64 / node_count as f64,
                    shortcuts_added
                );
            }
        }

        self.prepared = true;
        self.stats = PrepareStats {
            nodes: node_count,
            original_edges,
            shortcuts: shortcuts_added,
            lazy_updates,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            nodes = self.stats.nodes,
            shortcuts = self.stats.shortcuts,
            lazy_updates = self.stats.lazy_updates,
            elapsed_ms = self.stats.elapsed_ms,
            "Contraction Hierarchies preprocessing completed"
        );
        Ok(self.stats.clone())
    }

    /// Cheapest in-edge per in-neighbour and out-edge per out-neighbour,
    /// ignoring contracted nodes
    #[allow(clippy::type_complexity)]
    fn neighbours(
        &self,
        node: NodeId,
        contracted: &[bool],
    ) -> Result<(
        FxHashMap<NodeId, NeighbourEdge>,
        FxHashMap<NodeId, NeighbourEdge>,
    )> {
        let mut ins: FxHashMap<NodeId, NeighbourEdge> = FxHashMap::default();
        for view in self.graph.edges_filtered(node, &self.in_filter)? {
            let adj = view.adj_node();
            if contracted[adj as usize] {
                continue;
            }
            let weight = self
                .weighting
                .calc_weight(view.distance(), view.flags().swap_direction())?;
            if weight.is_infinite() {
                continue;
            }
            keep_cheapest(&mut ins, adj, view.edge(), weight);
        }

        let mut outs: FxHashMap<NodeId, NeighbourEdge> = FxHashMap::default();
        for view in self.graph.edges_filtered(node, &self.out_filter)? {
            let adj = view.adj_node();
            if contracted[adj as usize] {
                continue;
            }
            let weight = self.weighting.weight(&view)?;
            if weight.is_infinite() {
                continue;
            }
            keep_cheapest(&mut outs, adj, view.edge(), weight);
        }
        Ok((ins, outs))
    }

    /// Shortcuts needed to contract `node`; opposite shortcuts of equal
    /// weight come back merged as one bidirectional shortcut
    fn find_shortcuts(
        &self,
        node: NodeId,
        ins: &FxHashMap<NodeId, NeighbourEdge>,
        outs: &FxHashMap<NodeId, NeighbourEdge>,
        contracted: &[bool],
        witness: &mut WitnessSearch,
    ) -> Result<Vec<Shortcut>> {
        let mut sources: Vec<_> = ins.iter().map(|(&u, &e)| (u, e)).collect();
        sources.sort_unstable_by_key(|(u, _)| *u);
        let mut targets: Vec<_> = outs.iter().map(|(&w, &e)| (w, e)).collect();
        targets.sort_unstable_by_key(|(w, _)| *w);

        let mut needed: Vec<Shortcut> = Vec::new();
        for &(u, in_edge) in &sources {
            let max_out = targets
                .iter()
                .filter(|(w, _)| *w != u)
                .map(|(_, e)| e.weight)
                .fold(f64::NEG_INFINITY, f64::max);
            if max_out == f64::NEG_INFINITY {
                continue;
            }

            witness.run(
                &*self.graph,
                &self.weighting,
                &self.out_filter,
                contracted,
                u,
                node,
                in_edge.weight + max_out,
            )?;

            for &(w, out_edge) in &targets {
                if w == u {
                    continue;
                }
                let weight = in_edge.weight + out_edge.weight;
                if witness.weight_to(w) <= weight {
                    continue;
                }
                needed.push(Shortcut {
                    from: u,
                    to: w,
                    weight,
                    skipped: in_edge.edge,
                    both: false,
                });
            }
        }

        Ok(merge_opposite(needed))
    }

    fn priority(
        &self,
        node: NodeId,
        contracted: &[bool],
        contracted_neighbours: &[u32],
        witness: &mut WitnessSearch,
    ) -> Result<i64> {
        let (ins, outs) = self.neighbours(node, contracted)?;
        let shortcuts = self.find_shortcuts(node, &ins, &outs, contracted, witness)?;
        let needed: i64 = shortcuts
            .iter()
            .map(|sc| if sc.both { 2 } else { 1 })
            .sum();
        let removed = (ins.len() + outs.len()) as i64;
        let edge_difference = needed - removed;
        Ok(self.config.edge_difference_weight * edge_difference
            + self.config.contracted_neighbours_weight
                * contracted_neighbours[node as usize] as i64)
    }
}

impl<G: LevelGraph + ?Sized> AlgorithmPreparation for PrepareContractionHierarchies<'_, G> {
    fn do_work(&mut self) -> Result<()> {
        self.run().map(|_| ())
    }

    fn is_prepared(&self) -> bool {
        if self.prepared {
            return true;
        }
        let node_count = self.graph.node_count();
        node_count > 0
            && (0..node_count as NodeId)
                .all(|n| matches!(self.graph.level(n), Ok(level) if level != UNCONTRACTED))
    }

    fn create_algo(&self) -> Result<Box<dyn RoutingAlgorithm + '_>> {
        if !self.is_prepared() {
            return Err(Error::NotPrepared);
        }
        let algo = DijkstraBidirectionCh::new(&*self.graph)?
            .with_mode(self.mode)
            .with_weighting(self.weighting.clone());
        Ok(Box::new(algo))
    }
}

fn access(mode: Mode, incoming: bool, outgoing: bool) -> EdgeFilter {
    EdgeFilter::Access {
        mode: Some(mode),
        incoming,
        outgoing,
    }
}

fn keep_cheapest(
    map: &mut FxHashMap<NodeId, NeighbourEdge>,
    node: NodeId,
    edge: EdgeId,
    weight: f64,
) {
    map.entry(node)
        .and_modify(|e| {
            if weight < e.weight {
                *e = NeighbourEdge { edge, weight };
            }
        })
        .or_insert(NeighbourEdge { edge, weight });
}

/// Fold `u → w` and `w → u` of the same weight into one shortcut
fn merge_opposite(shortcuts: Vec<Shortcut>) -> Vec<Shortcut> {
    let mut index: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();
    let mut merged: Vec<Shortcut> = Vec::with_capacity(shortcuts.len());
    for sc in shortcuts {
        if let Some(&i) = index.get(&(sc.to, sc.from)) {
            let other = &mut merged[i];
            if !other.both && other.weight == sc.weight {
                other.both = true;
                continue;
            }
        }
        index.insert((sc.from, sc.to), merged.len());
        merged.push(sc);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Directory, Graph, LevelGraphStorage};

    fn line() -> LevelGraphStorage {
        let mut g = LevelGraphStorage::new(Directory::ram());
        g.create_new(3).unwrap();
        g.edge(0, 1, 5.0, true).unwrap();
        g.edge(1, 2, 3.0, true).unwrap();
        g
    }

    #[test]
    fn test_merge_opposite_shortcuts() {
        let sc = |from, to, weight| Shortcut {
            from,
            to,
            weight,
            skipped: 0,
            both: false,
        };
        let merged = merge_opposite(vec![
            sc(0, 2, 8.0),
            sc(2, 0, 8.0),
            sc(3, 4, 1.0),
            sc(4, 3, 2.0),
        ]);
        assert_eq!(merged.len(), 3);
        assert!(merged[0].both);
        assert!(!merged[1].both);
        assert!(!merged[2].both);
    }

    #[test]
    fn test_contracting_middle_node_adds_one_bidirectional_shortcut() {
        let mut g = line();
        let contracted = vec![false; 3];
        let prep = PrepareContractionHierarchies::new(&mut g);
        let mut witness = WitnessSearch::new(10);
        let (ins, outs) = prep.neighbours(1, &contracted).unwrap();
        assert_eq!(ins.len(), 2);
        assert_eq!(outs.len(), 2);

        let shortcuts = prep
            .find_shortcuts(1, &ins, &outs, &contracted, &mut witness)
            .unwrap();
        assert_eq!(shortcuts.len(), 1);
        assert!(shortcuts[0].both);
        assert_eq!(shortcuts[0].weight, 8.0);
    }

    #[test]
    fn test_witness_prevents_shortcut() {
        let mut g = line();
        g.edge(0, 2, 7.0, true).unwrap();
        let contracted = vec![false; 3];
        let prep = PrepareContractionHierarchies::new(&mut g);
        let mut witness = WitnessSearch::new(10);
        let (ins, outs) = prep.neighbours(1, &contracted).unwrap();
        let shortcuts = prep
            .find_shortcuts(1, &ins, &outs, &contracted, &mut witness)
            .unwrap();
        assert!(shortcuts.is_empty());
    }

    #[test]
    fn test_run_levels_every_node() {
        let mut g = line();
        let mut prep = PrepareContractionHierarchies::new(&mut g);
        assert!(!prep.is_prepared());
        let stats = prep.run().unwrap();
        assert!(prep.is_prepared());
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.original_edges, 2);

        let mut levels: Vec<_> = (0..3).map(|n| g.level(n).unwrap()).collect();
        levels.sort_unstable();
        assert_eq!(levels, vec![0, 1, 2]);
        assert_eq!(g.edge_count(), 2 + stats.shortcuts);
    }

    #[test]
    fn test_partially_prepared_graph_is_rejected() {
        let mut g = line();
        g.set_level(0, 0).unwrap();
        let mut prep = PrepareContractionHierarchies::new(&mut g);
        assert!(matches!(
            prep.run(),
            Err(Error::PartiallyPrepared {
                leveled: 1,
                node_count: 3
            })
        ));
        assert!(matches!(prep.create_algo(), Err(Error::NotPrepared)));
    }
}
