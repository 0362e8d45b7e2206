//! Error types and utilities for the butterfly-ch routing engine
//!
//! Provides the shared error type for graph storage, routing and preparation,
//! plus fuzzy matching to suggest corrections for misspelled user-facing names.

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

/// Minimum combined similarity for a suggestion to be offered.
///
/// Empirically tuned on short identifiers ("car", "bidijkstra"): low enough to
/// catch transpositions like "bkie" → "bike", high enough that unrelated input
/// yields no suggestion at all.
const MIN_SUGGESTION_SCORE: f64 = 0.7;

/// Find the best fuzzy match using Jaro-Winkler (70%) and normalized Levenshtein (30%)
fn find_best_fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    for &candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        // Jaro-Winkler rewards shared prefixes, Levenshtein covers dropped letters.
        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = (jw_score * 0.7) + (lev_score * 0.3);

        // Substring bonus: "dijkstra" inside "bidijkstra" is a strong signal.
        if input_lower.len() >= 3
            && (candidate_lower.contains(&input_lower) || input_lower.contains(&candidate_lower))
        {
            score += 0.1;
        }

        if score > best_score && score >= MIN_SUGGESTION_SCORE {
            best_score = score;
            best_match = Some(candidate);
        }
    }

    best_match
}

/// Suggest a correction for a potentially misspelled name.
///
/// Returns `None` when the input already matches a candidate (ignoring case)
/// or when nothing is similar enough.
pub fn suggest_correction(input: &str, candidates: &[&str]) -> Option<String> {
    if candidates.iter().any(|c| c.eq_ignore_ascii_case(input)) {
        return None;
    }

    find_best_fuzzy_match(input, candidates).map(str::to_string)
}

/// Main error type for butterfly-ch operations
#[derive(Debug, Error)]
pub enum Error {
    /// Node index outside `0..node_count`
    #[error("node {node} is out of range (node count {node_count})")]
    NodeOutOfRange { node: u32, node_count: usize },

    /// Edge index outside `0..edge_count`
    #[error("edge {edge} is out of range (edge count {edge_count})")]
    EdgeOutOfRange { edge: u32, edge_count: usize },

    /// Node that is not an endpoint of the edge
    #[error("node {node} is not an endpoint of edge {edge}")]
    NotIncident { edge: u32, node: u32 },

    /// Distance that is negative, NaN, infinite or too large for the fixed-point slot
    #[error("invalid edge distance {0}: must be finite, non-negative and representable")]
    InvalidDistance(f64),

    /// Weight calculation produced a negative or NaN cost
    #[error("invalid edge weight {0}: weights must be non-negative")]
    InvalidWeight(f64),

    /// An edge whose endpoints are the same node
    #[error("self-loop on node {0} is not supported")]
    SelfLoop(u32),

    /// Edge filter that can never accept an edge
    #[error("invalid edge filter: {0}")]
    InvalidFilter(String),

    /// `create`/`create_new`/`load_existing` on an already initialized storage
    #[error("graph storage is already initialized")]
    AlreadyInitialized,

    /// Storage used before `create_new`, `create` or `load_existing`
    #[error("graph storage is not initialized")]
    NotInitialized,

    /// Layout extension requested after initialization
    #[error("storage layout is frozen once the storage is initialized")]
    LayoutFrozen,

    /// Index space of a segment exhausted
    #[error("capacity exceeded: {requested} slots requested in segment '{segment}'")]
    CapacityExceeded { segment: String, requested: u64 },

    /// The allocator could not satisfy a growth request
    #[error("allocation of {bytes} bytes failed for segment '{segment}'")]
    AllocationFailed { segment: String, bytes: u64 },

    /// CH-aware query on a graph without a complete contraction order
    #[error("graph is not prepared for contraction hierarchies")]
    NotPrepared,

    /// Some nodes have levels and some do not: an interrupted preparation
    #[error("graph is partially prepared ({leveled} of {node_count} nodes leveled); rebuild it")]
    PartiallyPrepared { leveled: usize, node_count: usize },

    /// `calc_path` called twice without `clear()`
    #[error("{0} was already used; call clear() before the next query")]
    AlgorithmAlreadyUsed(String),

    /// Shortcut whose skipped edge cannot be resolved into two sub-edges
    #[error("shortcut edge {edge} cannot be unrolled: {reason}")]
    UnrecoverableShortcut { edge: u32, reason: String },

    /// Persisted data written with a different record layout
    #[error("incompatible storage layout: {0}")]
    IncompatibleLayout(String),

    /// Persisted segment with bad magic, version or checksum
    #[error("corrupt segment '{segment}': {reason}")]
    CorruptSegment { segment: String, reason: String },

    /// Serialization of storage properties failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value or file
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;
