//! Level graph: flat storage plus a contraction level per node and a
//! skipped-edge link per edge

use butterfly_common::Result;

use super::graph_storage::GraphStorage;
use super::{Directory, EdgeId, Graph, Level, LevelGraph, NodeId, Storable, NO_EDGE, UNCONTRACTED};
use crate::flags::EdgeFlags;

/// Graph storage extended for contraction hierarchies
#[derive(Debug, Clone)]
pub struct LevelGraphStorage {
    base: GraphStorage,
    i_level: usize,
    i_skipped_edge: usize,
}

impl LevelGraphStorage {
    pub fn new(dir: Directory) -> Self {
        let mut base = GraphStorage::new(dir);
        // A fresh storage is never initialized, so reservation cannot fail.
        let i_level = base.reserve_node_slot().unwrap_or_default();
        let i_skipped_edge = base.reserve_edge_slot().unwrap_or_default();
        base.reserve_shortcut_weight_slots().unwrap_or_default();
        Self {
            base,
            i_level,
            i_skipped_edge,
        }
    }

    pub fn create_new(&mut self, expected_nodes: usize) -> Result<()> {
        self.base.create_new(expected_nodes)
    }

    /// Number of nodes with an assigned level
    pub fn leveled_nodes(&self) -> usize {
        (0..self.base.node_count() as NodeId)
            .filter(|&n| self.base.node_slot(n, self.i_level) != UNCONTRACTED)
            .count()
    }

    /// Human-readable dump of every edge with its skipped link
    pub fn dump_edges(&self) -> String {
        let mut out = String::new();
        for view in self.base.all_edges() {
            let skipped = self.skipped_edge(view.edge());
            if skipped == NO_EDGE {
                out.push_str(&format!("{view}\n"));
            } else {
                out.push_str(&format!("{view} skips {skipped}\n"));
            }
        }
        out
    }
}

impl Graph for LevelGraphStorage {
    fn storage(&self) -> &GraphStorage {
        &self.base
    }

    fn storage_mut(&mut self) -> &mut GraphStorage {
        &mut self.base
    }

    fn skipped_edge(&self, edge: EdgeId) -> EdgeId {
        if self.base.check_edge(edge).is_err() {
            return NO_EDGE;
        }
        self.base.edge_slot(edge, self.i_skipped_edge)
    }
}

impl LevelGraph for LevelGraphStorage {
    fn set_level(&mut self, node: NodeId, level: Level) -> Result<()> {
        self.base.ensure_node_index(node)?;
        self.base.set_node_slot(node, self.i_level, level);
        Ok(())
    }

    fn level(&self, node: NodeId) -> Result<Level> {
        self.base.check_node(node)?;
        Ok(self.base.node_slot(node, self.i_level))
    }

    fn shortcut(
        &mut self,
        from: NodeId,
        to: NodeId,
        distance: f64,
        flags: EdgeFlags,
        skipped: EdgeId,
    ) -> Result<EdgeId> {
        self.base.check_edge(skipped)?;
        let edge = self.base.add_edge(from, to, distance, flags)?;
        self.base.set_edge_slot(edge, self.i_skipped_edge, skipped);
        self.base.set_shortcut_weight(edge, distance);
        Ok(edge)
    }

    fn set_skipped_edge(&mut self, edge: EdgeId, skipped: EdgeId) -> Result<()> {
        self.base.check_edge(edge)?;
        if skipped != NO_EDGE {
            self.base.check_edge(skipped)?;
        }
        self.base.set_edge_slot(edge, self.i_skipped_edge, skipped);
        Ok(())
    }
}

impl Storable for LevelGraphStorage {
    fn load_existing(&mut self) -> Result<bool> {
        self.base.load_existing()
    }

    fn create(&mut self, bytes: u64) -> Result<&mut Self> {
        self.base.create(bytes)?;
        Ok(self)
    }

    fn flush(&mut self) -> Result<()> {
        self.base.flush()
    }

    fn close(&mut self) {
        self.base.close()
    }

    fn capacity(&self) -> u64 {
        self.base.capacity()
    }
}
