//! Shortest-path searches over a [`Graph`](crate::storage::Graph)

pub mod bidirectional;
pub mod dijkstra;
pub mod filter;
pub mod path;
pub mod weighting;

use std::fmt;
use std::str::FromStr;

use butterfly_common::{suggest_correction, Error, Result};
use serde::{Deserialize, Serialize};

use crate::flags::Mode;
use crate::storage::{Graph, NodeId};

pub use bidirectional::DijkstraBidirection;
pub use dijkstra::Dijkstra;
pub use filter::EdgeFilter;
pub use path::Path;
pub use weighting::WeightCalculation;

/// Lifecycle of one algorithm instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Init,
    Running,
    Found,
    Exhausted,
}

/// A single-use point-to-point search; call `clear` before reusing it
pub trait RoutingAlgorithm {
    /// Shortest path from `from` to `to`. No path is `Path::not_found()`, not an error.
    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Result<Path>;

    /// Drop all search state and return to `SearchState::Init`
    fn clear(&mut self);

    fn state(&self) -> SearchState;

    /// Nodes settled by the last search
    fn visited_nodes(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Which search to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlgorithmType {
    Dijkstra,
    #[default]
    DijkstraBidirection,
    DijkstraBidirectionCh,
}

impl AlgorithmType {
    pub fn all() -> &'static [AlgorithmType] {
        &[
            AlgorithmType::Dijkstra,
            AlgorithmType::DijkstraBidirection,
            AlgorithmType::DijkstraBidirectionCh,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmType::Dijkstra => "dijkstra",
            AlgorithmType::DijkstraBidirection => "bidijkstra",
            AlgorithmType::DijkstraBidirectionCh => "ch",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        if let Some(algo) = AlgorithmType::all()
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(input))
        {
            return Ok(*algo);
        }

        let names: Vec<&str> = AlgorithmType::all().iter().map(|a| a.name()).collect();
        let msg = match suggest_correction(input, &names) {
            Some(suggestion) => format!("unknown algorithm '{s}', did you mean '{suggestion}'?"),
            None => format!("unknown algorithm '{s}', expected one of: {}", names.join(", ")),
        };
        Err(Error::Config(msg))
    }
}

impl TryFrom<String> for AlgorithmType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<AlgorithmType> for String {
    fn from(algo: AlgorithmType) -> Self {
        algo.name().to_string()
    }
}

/// Optional preprocessing step producing ready-to-use algorithms
pub trait AlgorithmPreparation {
    fn do_work(&mut self) -> Result<()>;

    fn is_prepared(&self) -> bool;

    fn create_algo(&self) -> Result<Box<dyn RoutingAlgorithm + '_>>;
}

/// Preparation for searches that need none
pub struct NoOpAlgorithmPreparation<'a, G: Graph + ?Sized> {
    graph: &'a G,
    algorithm: AlgorithmType,
    weighting: WeightCalculation,
    mode: Option<Mode>,
}

impl<'a, G: Graph + ?Sized> NoOpAlgorithmPreparation<'a, G> {
    pub fn new(graph: &'a G, algorithm: AlgorithmType) -> Self {
        Self {
            graph,
            algorithm,
            weighting: WeightCalculation::Shortest,
            mode: None,
        }
    }

    pub fn with_weighting(mut self, weighting: WeightCalculation) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
}

impl<G: Graph + ?Sized> AlgorithmPreparation for NoOpAlgorithmPreparation<'_, G> {
    fn do_work(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        true
    }

    fn create_algo(&self) -> Result<Box<dyn RoutingAlgorithm + '_>> {
        match self.algorithm {
            AlgorithmType::Dijkstra => {
                let mut algo = Dijkstra::new(self.graph).with_weighting(self.weighting.clone());
                if let Some(mode) = self.mode {
                    algo = algo.with_mode(mode);
                }
                Ok(Box::new(algo))
            }
            AlgorithmType::DijkstraBidirection => {
                let mut algo =
                    DijkstraBidirection::new(self.graph).with_weighting(self.weighting.clone());
                if let Some(mode) = self.mode {
                    algo = algo.with_mode(mode);
                }
                Ok(Box::new(algo))
            }
            AlgorithmType::DijkstraBidirectionCh => Err(Error::NotPrepared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Directory, GraphStorage};

    #[test]
    fn test_algorithm_type_parsing() {
        assert_eq!(
            "CH".parse::<AlgorithmType>().unwrap(),
            AlgorithmType::DijkstraBidirectionCh
        );
        let err = "dijkstr".parse::<AlgorithmType>().unwrap_err();
        assert!(err.to_string().contains("did you mean 'dijkstra'"));
    }

    #[test]
    fn test_noop_preparation() {
        let mut g = GraphStorage::new(Directory::ram());
        g.create_new(2).unwrap();
        g.edge(0, 1, 2.0, true).unwrap();

        let mut prep = NoOpAlgorithmPreparation::new(&g, AlgorithmType::Dijkstra);
        prep.do_work().unwrap();
        assert!(prep.is_prepared());

        let mut algo = prep.create_algo().unwrap();
        assert_eq!(algo.name(), "dijkstra");
        assert_eq!(algo.calc_path(0, 1).unwrap().weight(), 2.0);

        let ch = NoOpAlgorithmPreparation::new(&g, AlgorithmType::DijkstraBidirectionCh);
        assert!(matches!(ch.create_algo(), Err(Error::NotPrepared)));
    }
}
