//! Butterfly-ch - flat graph storage and contraction-hierarchy routing
//!
//! A road graph lives in flat `u32` record arrays ([`storage`]). Searches
//! ([`routing`]) run plain or bidirectional Dijkstra over it, and
//! [`ch`] contracts a [`LevelGraphStorage`] so that queries only climb the
//! node hierarchy.
//!
//! ```no_run
//! use butterfly_ch::{Directory, Graph, LevelGraphStorage, RoutingConfig, Storable};
//! use butterfly_ch::routing::AlgorithmPreparation;
//!
//! # fn main() -> butterfly_ch::Result<()> {
//! let mut graph = LevelGraphStorage::new(Directory::at("graph-data"));
//! if !graph.load_existing()? {
//!     graph.create_new(1000)?;
//!     graph.edge(0, 1, 120.0, true)?;
//!     graph.edge(1, 2, 80.0, false)?;
//! }
//!
//! let config = RoutingConfig::from_toml_str("algorithm = \"ch\"")?;
//! config.prepare(&mut graph).do_work()?;
//! graph.flush()?;
//!
//! let mut algo = config.create_algo(&graph)?;
//! let path = algo.calc_path(0, 2)?;
//! println!("{path}");
//! # Ok(())
//! # }
//! ```

pub mod ch;
pub mod config;
pub mod flags;
pub mod routing;
pub mod storage;

pub use butterfly_common::{Error, Result};
pub use ch::{DijkstraBidirectionCh, PrepareContractionHierarchies, PrepareStats};
pub use config::{PrepareConfig, RoutingConfig, Weighting};
pub use flags::{EdgeFlags, Mode};
pub use routing::{
    AlgorithmType, Dijkstra, DijkstraBidirection, EdgeFilter, Path, RoutingAlgorithm,
    SearchState, WeightCalculation,
};
pub use storage::{
    Directory, EdgeId, EdgeView, Graph, GraphStorage, Level, LevelGraph, LevelGraphStorage,
    NodeId, Storable, NO_EDGE, UNCONTRACTED,
};
