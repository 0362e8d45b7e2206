//! Flat, index-addressed graph storage
//!
//! Nodes and edges are fixed-size records of `u32` slots in growable
//! segments. Adjacency lists are threaded through the edge records
//! (`link_a`/`link_b`), so adding an edge is an O(1) prepend into the lists
//! of both endpoints.

pub mod data_access;
pub mod directory;
pub mod graph_storage;
pub mod iter;
pub mod level;

use butterfly_common::Result;

use crate::flags::EdgeFlags;
use crate::routing::filter::EdgeFilter;

pub use data_access::DataAccess;
pub use directory::Directory;
pub use graph_storage::GraphStorage;
pub use iter::{AllEdgesIterator, EdgeIterator, EdgeView};
pub use level::LevelGraphStorage;

pub type NodeId = u32;
pub type EdgeId = u32;
pub type Level = u32;

/// End of an adjacency list, or "no skipped edge"
pub const NO_EDGE: EdgeId = u32::MAX;

/// Level of a node that has not been contracted yet
pub const UNCONTRACTED: Level = u32::MAX;

/// Read and write access to a flat graph.
///
/// Implementors only provide `storage`/`storage_mut`; everything else
/// delegates to the underlying [`GraphStorage`]. Extensions override
/// `skipped_edge` when they carry shortcut links.
pub trait Graph {
    fn storage(&self) -> &GraphStorage;

    fn storage_mut(&mut self) -> &mut GraphStorage;

    fn node_count(&self) -> usize {
        self.storage().node_count()
    }

    fn edge_count(&self) -> usize {
        self.storage().edge_count()
    }

    /// Add an edge open to every mode at the default speed
    fn edge(&mut self, from: NodeId, to: NodeId, distance: f64, both: bool) -> Result<EdgeId> {
        self.edge_with_flags(from, to, distance, EdgeFlags::default_flags(both))
    }

    fn edge_with_flags(
        &mut self,
        from: NodeId,
        to: NodeId,
        distance: f64,
        flags: EdgeFlags,
    ) -> Result<EdgeId> {
        self.storage_mut().add_edge(from, to, distance, flags)
    }

    /// Edges incident to `node` accepted by `filter`
    fn edges_filtered<'a>(
        &'a self,
        node: NodeId,
        filter: &'a EdgeFilter,
    ) -> Result<EdgeIterator<'a>> {
        self.storage().edges_filtered(node, filter)
    }

    fn get_edges(&self, node: NodeId) -> Result<EdgeIterator<'_>> {
        self.edges_filtered(node, EdgeFilter::all_edges())
    }

    fn get_outgoing(&self, node: NodeId) -> Result<EdgeIterator<'_>> {
        self.edges_filtered(node, EdgeFilter::outgoing())
    }

    fn get_incoming(&self, node: NodeId) -> Result<EdgeIterator<'_>> {
        self.edges_filtered(node, EdgeFilter::incoming())
    }

    fn get_all_edges(&self) -> AllEdgesIterator<'_> {
        self.storage().all_edges()
    }

    /// Single edge oriented so that `adj_node == end_node`
    fn edge_props(&self, edge: EdgeId, end_node: NodeId) -> Result<EdgeView> {
        self.storage().edge_props(edge, end_node)
    }

    fn set_flags(&mut self, edge: EdgeId, flags: EdgeFlags) -> Result<()> {
        self.storage_mut().set_flags(edge, flags)
    }

    /// Edge summarized together with another by a shortcut; `NO_EDGE` for plain graphs
    fn skipped_edge(&self, _edge: EdgeId) -> EdgeId {
        NO_EDGE
    }
}

/// Graph with per-node contraction levels and per-edge shortcut links
pub trait LevelGraph: Graph {
    fn set_level(&mut self, node: NodeId, level: Level) -> Result<()>;

    fn level(&self, node: NodeId) -> Result<Level>;

    /// Add a shortcut edge summarizing `skipped` and one adjacent edge
    fn shortcut(
        &mut self,
        from: NodeId,
        to: NodeId,
        distance: f64,
        flags: EdgeFlags,
        skipped: EdgeId,
    ) -> Result<EdgeId>;

    fn set_skipped_edge(&mut self, edge: EdgeId, skipped: EdgeId) -> Result<()>;
}

/// Lifecycle of a storage backed by a [`Directory`]
pub trait Storable {
    /// Load previously flushed data. `Ok(false)` when there is nothing to load.
    fn load_existing(&mut self) -> Result<bool>;

    /// Allocate roughly `bytes` of initial capacity
    fn create(&mut self, bytes: u64) -> Result<&mut Self>;

    /// Persist all segments; a no-op for RAM directories
    fn flush(&mut self) -> Result<()>;

    /// Release memory without flushing
    fn close(&mut self);

    /// Allocated bytes
    fn capacity(&self) -> u64;
}
