//! Contraction Hierarchies: preprocessing and query

pub mod prepare;
pub mod query;
mod witness;

pub use prepare::{PrepareContractionHierarchies, PrepareStats};
pub use query::DijkstraBidirectionCh;
