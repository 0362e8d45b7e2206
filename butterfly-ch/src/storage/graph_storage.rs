//! Node and edge tables with linked adjacency lists
//!
//! Node record (base layout, one slot):
//!   edge_ref   first edge of the node's adjacency list, NO_EDGE if empty
//!
//! Edge record (base layout, six slots):
//!   node_a, node_b   endpoints
//!   link_a           next edge in node_a's list
//!   link_b           next edge in node_b's list
//!   distance         fixed point, thousandths of a unit
//!   flags            EdgeFlags seen from node_a
//!
//! Extensions append slots to either record with `reserve_node_slot` /
//! `reserve_edge_slot` before the storage is initialized. Every slot starts
//! out as `u32::MAX`. A level graph also reserves two edge slots holding the
//! exact `f64` weight of shortcuts; the distance slot keeps its rounded value.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::data_access::DataAccess;
use super::directory::Directory;
use super::iter::{AllEdgesIterator, EdgeIterator, EdgeView};
use super::{EdgeId, Graph, NodeId, Storable};
use crate::flags::EdgeFlags;
use crate::routing::filter::EdgeFilter;

const N_EDGE_REF: usize = 0;

const E_NODEA: usize = 0;
const E_NODEB: usize = 1;
const E_LINKA: usize = 2;
const E_LINKB: usize = 3;
const E_DIST: usize = 4;
const E_FLAGS: usize = 5;

const BASE_NODE_ENTRY_SIZE: usize = 1;
const BASE_EDGE_ENTRY_SIZE: usize = 6;

/// Fixed-point scale of the distance slot
pub const DISTANCE_FACTOR: f64 = 1000.0;

/// Largest usable node or edge index; `u32::MAX` is reserved for sentinels
const MAX_INDEX: u64 = u32::MAX as u64 - 1;

const PROPERTIES_VERSION: u32 = 1;
const PROPERTIES_FILE: &str = "properties";

/// Layout and counts persisted next to the segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StorageProperties {
    version: u32,
    node_entry_size: usize,
    edge_entry_size: usize,
    node_count: usize,
    edge_count: usize,
}

/// Convert a distance to its fixed-point slot value
pub fn distance_to_raw(distance: f64) -> Result<u32> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(Error::InvalidDistance(distance));
    }
    let raw = (distance * DISTANCE_FACTOR).round();
    if raw >= u32::MAX as f64 {
        return Err(Error::InvalidDistance(distance));
    }
    Ok(raw as u32)
}

#[inline]
pub fn raw_to_distance(raw: u32) -> f64 {
    raw as f64 / DISTANCE_FACTOR
}

fn slots_for(segment: &DataAccess, records: usize, entry_size: usize) -> Result<usize> {
    records
        .checked_mul(entry_size)
        .ok_or_else(|| Error::CapacityExceeded {
            segment: segment.name().to_string(),
            requested: records as u64,
        })
}

/// Flat graph storage
#[derive(Debug, Clone)]
pub struct GraphStorage {
    dir: Directory,
    nodes: DataAccess,
    edges: DataAccess,
    node_entry_size: usize,
    edge_entry_size: usize,
    node_count: usize,
    edge_count: usize,
    shortcut_weight_slot: Option<usize>,
    initialized: bool,
}

impl GraphStorage {
    pub fn new(dir: Directory) -> Self {
        Self {
            dir,
            nodes: DataAccess::new("nodes", u32::MAX),
            edges: DataAccess::new("edges", u32::MAX),
            node_entry_size: BASE_NODE_ENTRY_SIZE,
            edge_entry_size: BASE_EDGE_ENTRY_SIZE,
            node_count: 0,
            edge_count: 0,
            shortcut_weight_slot: None,
            initialized: false,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.dir
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Append a slot to every node record; returns its index within the record
    pub fn reserve_node_slot(&mut self) -> Result<usize> {
        if self.initialized {
            return Err(Error::LayoutFrozen);
        }
        self.node_entry_size += 1;
        Ok(self.node_entry_size - 1)
    }

    /// Append a slot to every edge record; returns its index within the record
    pub fn reserve_edge_slot(&mut self) -> Result<usize> {
        if self.initialized {
            return Err(Error::LayoutFrozen);
        }
        self.edge_entry_size += 1;
        Ok(self.edge_entry_size - 1)
    }

    /// Append two edge slots holding exact shortcut weights (low and high
    /// half of the `f64` bits); returns the index of the low half
    pub(crate) fn reserve_shortcut_weight_slots(&mut self) -> Result<usize> {
        let low = self.reserve_edge_slot()?;
        self.reserve_edge_slot()?;
        self.shortcut_weight_slot = Some(low);
        Ok(low)
    }

    /// Allocate room for `expected_nodes` nodes and twice as many edges
    pub fn create_new(&mut self, expected_nodes: usize) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        let nodes = expected_nodes.max(1);
        let node_slots = slots_for(&self.nodes, nodes, self.node_entry_size)?;
        let edge_slots = slots_for(&self.edges, nodes.saturating_mul(2), self.edge_entry_size)?;
        self.nodes.ensure_capacity(node_slots)?;
        self.edges.ensure_capacity(edge_slots)?;
        self.initialized = true;
        debug!(
            expected_nodes,
            node_entry_size = self.node_entry_size,
            edge_entry_size = self.edge_entry_size,
            "Graph storage created"
        );
        Ok(())
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn check_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    pub fn check_node(&self, node: NodeId) -> Result<()> {
        if (node as usize) < self.node_count {
            Ok(())
        } else {
            Err(Error::NodeOutOfRange {
                node,
                node_count: self.node_count,
            })
        }
    }

    pub fn check_edge(&self, edge: EdgeId) -> Result<()> {
        if (edge as usize) < self.edge_count {
            Ok(())
        } else {
            Err(Error::EdgeOutOfRange {
                edge,
                edge_count: self.edge_count,
            })
        }
    }

    /// Make `node` addressable, growing the node table if needed
    pub(crate) fn ensure_node_index(&mut self, node: NodeId) -> Result<()> {
        self.check_initialized()?;
        if node as u64 > MAX_INDEX {
            return Err(Error::CapacityExceeded {
                segment: self.nodes.name().to_string(),
                requested: node as u64 + 1,
            });
        }
        let index = node as usize;
        if index < self.node_count {
            return Ok(());
        }
        self.nodes
            .ensure_capacity((index + 1) * self.node_entry_size)?;
        self.node_count = index + 1;
        Ok(())
    }

    pub(crate) fn add_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        distance: f64,
        flags: EdgeFlags,
    ) -> Result<EdgeId> {
        self.check_initialized()?;
        if a == b {
            return Err(Error::SelfLoop(a));
        }
        let raw_distance = distance_to_raw(distance)?;
        self.ensure_node_index(a)?;
        self.ensure_node_index(b)?;

        if self.edge_count as u64 > MAX_INDEX {
            return Err(Error::CapacityExceeded {
                segment: self.edges.name().to_string(),
                requested: self.edge_count as u64 + 1,
            });
        }
        let edge = self.edge_count as EdgeId;
        self.edges
            .ensure_capacity((self.edge_count + 1) * self.edge_entry_size)?;

        let link_a = self.first_edge(a);
        let link_b = self.first_edge(b);
        let base = self.edge_pointer(edge);
        self.edges.set(base + E_NODEA, a);
        self.edges.set(base + E_NODEB, b);
        self.edges.set(base + E_LINKA, link_a);
        self.edges.set(base + E_LINKB, link_b);
        self.edges.set(base + E_DIST, raw_distance);
        self.edges.set(base + E_FLAGS, flags.bits());

        self.set_first_edge(a, edge);
        self.set_first_edge(b, edge);
        self.edge_count += 1;
        Ok(edge)
    }

    #[inline]
    fn node_pointer(&self, node: NodeId) -> usize {
        node as usize * self.node_entry_size
    }

    #[inline]
    fn edge_pointer(&self, edge: EdgeId) -> usize {
        edge as usize * self.edge_entry_size
    }

    #[inline]
    pub(crate) fn first_edge(&self, node: NodeId) -> EdgeId {
        self.nodes.get(self.node_pointer(node) + N_EDGE_REF)
    }

    #[inline]
    fn set_first_edge(&mut self, node: NodeId, edge: EdgeId) {
        let ptr = self.node_pointer(node) + N_EDGE_REF;
        self.nodes.set(ptr, edge);
    }

    #[inline]
    pub(crate) fn node_a(&self, edge: EdgeId) -> NodeId {
        self.edges.get(self.edge_pointer(edge) + E_NODEA)
    }

    #[inline]
    pub(crate) fn node_b(&self, edge: EdgeId) -> NodeId {
        self.edges.get(self.edge_pointer(edge) + E_NODEB)
    }

    #[inline]
    pub(crate) fn link_a(&self, edge: EdgeId) -> EdgeId {
        self.edges.get(self.edge_pointer(edge) + E_LINKA)
    }

    #[inline]
    pub(crate) fn link_b(&self, edge: EdgeId) -> EdgeId {
        self.edges.get(self.edge_pointer(edge) + E_LINKB)
    }

    #[inline]
    pub(crate) fn raw_distance(&self, edge: EdgeId) -> u32 {
        self.edges.get(self.edge_pointer(edge) + E_DIST)
    }

    /// Exact weight of a shortcut, `None` for other edges or when no slots
    /// were reserved
    pub(crate) fn shortcut_weight(&self, edge: EdgeId, flags: EdgeFlags) -> Option<f64> {
        if !flags.is_shortcut() {
            return None;
        }
        let slot = self.shortcut_weight_slot?;
        let low = self.edge_slot(edge, slot);
        let high = self.edge_slot(edge, slot + 1);
        if low == u32::MAX && high == u32::MAX {
            return None;
        }
        Some(f64::from_bits(((high as u64) << 32) | low as u64))
    }

    pub(crate) fn set_shortcut_weight(&mut self, edge: EdgeId, weight: f64) {
        if let Some(slot) = self.shortcut_weight_slot {
            let bits = weight.to_bits();
            self.set_edge_slot(edge, slot, bits as u32);
            self.set_edge_slot(edge, slot + 1, (bits >> 32) as u32);
        }
    }

    /// Flags as stored, seen from node_a
    #[inline]
    pub(crate) fn raw_flags(&self, edge: EdgeId) -> EdgeFlags {
        EdgeFlags::from_bits(self.edges.get(self.edge_pointer(edge) + E_FLAGS))
    }

    #[inline]
    pub(crate) fn node_slot(&self, node: NodeId, slot: usize) -> u32 {
        self.nodes.get(self.node_pointer(node) + slot)
    }

    #[inline]
    pub(crate) fn set_node_slot(&mut self, node: NodeId, slot: usize, value: u32) {
        let ptr = self.node_pointer(node) + slot;
        self.nodes.set(ptr, value);
    }

    #[inline]
    pub(crate) fn edge_slot(&self, edge: EdgeId, slot: usize) -> u32 {
        self.edges.get(self.edge_pointer(edge) + slot)
    }

    #[inline]
    pub(crate) fn set_edge_slot(&mut self, edge: EdgeId, slot: usize, value: u32) {
        let ptr = self.edge_pointer(edge) + slot;
        self.edges.set(ptr, value);
    }

    /// Lazy iterator over the edges of `node` accepted by `filter`
    pub fn edges_filtered<'a>(
        &'a self,
        node: NodeId,
        filter: &'a EdgeFilter,
    ) -> Result<EdgeIterator<'a>> {
        self.check_node(node)?;
        Ok(EdgeIterator::new(self, node, self.first_edge(node), filter))
    }

    pub fn all_edges(&self) -> AllEdgesIterator<'_> {
        AllEdgesIterator::new(self)
    }

    /// View of `edge` oriented from node_a to node_b
    pub(crate) fn view(&self, edge: EdgeId) -> EdgeView {
        let flags = self.raw_flags(edge);
        EdgeView::new(
            edge,
            self.node_a(edge),
            self.node_b(edge),
            self.raw_distance(edge),
            flags,
        )
        .with_exact_weight(self.shortcut_weight(edge, flags))
    }

    pub fn edge_props(&self, edge: EdgeId, end_node: NodeId) -> Result<EdgeView> {
        self.check_edge(edge)?;
        let a = self.node_a(edge);
        let b = self.node_b(edge);
        let flags = self.raw_flags(edge);
        let raw_distance = self.raw_distance(edge);
        let exact = self.shortcut_weight(edge, flags);
        if end_node == b {
            Ok(EdgeView::new(edge, a, b, raw_distance, flags).with_exact_weight(exact))
        } else if end_node == a {
            Ok(EdgeView::new(edge, b, a, raw_distance, flags.swap_direction())
                .with_exact_weight(exact))
        } else {
            Err(Error::NotIncident {
                edge,
                node: end_node,
            })
        }
    }

    /// Rewrite the flags of `edge`, given from node_a's point of view
    pub fn set_flags(&mut self, edge: EdgeId, flags: EdgeFlags) -> Result<()> {
        self.check_edge(edge)?;
        let ptr = self.edge_pointer(edge) + E_FLAGS;
        self.edges.set(ptr, flags.bits());
        Ok(())
    }

    fn properties(&self) -> StorageProperties {
        StorageProperties {
            version: PROPERTIES_VERSION,
            node_entry_size: self.node_entry_size,
            edge_entry_size: self.edge_entry_size,
            node_count: self.node_count,
            edge_count: self.edge_count,
        }
    }

    fn check_layout(&self, props: &StorageProperties) -> Result<()> {
        if props.version != PROPERTIES_VERSION {
            return Err(Error::IncompatibleLayout(format!(
                "properties version {} (expected {PROPERTIES_VERSION})",
                props.version
            )));
        }
        if props.node_entry_size != self.node_entry_size
            || props.edge_entry_size != self.edge_entry_size
        {
            return Err(Error::IncompatibleLayout(format!(
                "stored record sizes node={} edge={}, expected node={} edge={}",
                props.node_entry_size,
                props.edge_entry_size,
                self.node_entry_size,
                self.edge_entry_size
            )));
        }
        Ok(())
    }
}

impl Graph for GraphStorage {
    fn storage(&self) -> &GraphStorage {
        self
    }

    fn storage_mut(&mut self) -> &mut GraphStorage {
        self
    }
}

impl Storable for GraphStorage {
    fn load_existing(&mut self) -> Result<bool> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        let Some(props_path) = self.dir.segment_path(PROPERTIES_FILE) else {
            return Ok(false);
        };
        if !props_path.exists() {
            return Ok(false);
        }

        let reader = BufReader::new(File::open(&props_path)?);
        let props: StorageProperties = bincode::deserialize_from(reader)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.check_layout(&props)?;

        if let Some(path) = self.dir.segment_path(self.nodes.name()) {
            self.nodes.read_from(&path)?;
        }
        if let Some(path) = self.dir.segment_path(self.edges.name()) {
            self.edges.read_from(&path)?;
        }

        if self.nodes.len() < props.node_count * self.node_entry_size {
            return Err(Error::CorruptSegment {
                segment: self.nodes.name().to_string(),
                reason: format!("too short for {} nodes", props.node_count),
            });
        }
        if self.edges.len() < props.edge_count * self.edge_entry_size {
            return Err(Error::CorruptSegment {
                segment: self.edges.name().to_string(),
                reason: format!("too short for {} edges", props.edge_count),
            });
        }

        self.node_count = props.node_count;
        self.edge_count = props.edge_count;
        self.initialized = true;
        info!(
            nodes = self.node_count,
            edges = self.edge_count,
            location = ?self.dir.location(),
            "Loaded graph storage"
        );
        Ok(true)
    }

    fn create(&mut self, bytes: u64) -> Result<&mut Self> {
        let node_bytes = (self.node_entry_size * std::mem::size_of::<u32>()) as u64;
        let expected_nodes = usize::try_from(bytes / node_bytes).unwrap_or(usize::MAX);
        self.create_new(expected_nodes)?;
        Ok(self)
    }

    fn flush(&mut self) -> Result<()> {
        self.check_initialized()?;
        if !self.dir.is_persistent() {
            return Ok(());
        }
        self.dir.ensure_exists()?;

        if let Some(path) = self.dir.segment_path(self.nodes.name()) {
            self.nodes
                .write_to(&path, self.node_count * self.node_entry_size)?;
        }
        if let Some(path) = self.dir.segment_path(self.edges.name()) {
            self.edges
                .write_to(&path, self.edge_count * self.edge_entry_size)?;
        }
        if let Some(path) = self.dir.segment_path(PROPERTIES_FILE) {
            let writer = BufWriter::new(File::create(&path)?);
            bincode::serialize_into(writer, &self.properties())
                .map_err(|e| Error::Serialization(e.to_string()))?;
        }

        info!(
            nodes = self.node_count,
            edges = self.edge_count,
            location = ?self.dir.location(),
            "Flushed graph storage"
        );
        Ok(())
    }

    fn close(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_count = 0;
        self.edge_count = 0;
        self.initialized = false;
    }

    fn capacity(&self) -> u64 {
        self.nodes.capacity_bytes() + self.edges.capacity_bytes()
    }
}
