//! Routing configuration
//!
//! Loaded from TOML; every field is optional:
//!
//! ```toml
//! mode = "car"
//! weighting = "fastest"
//! algorithm = "ch"
//!
//! [prepare]
//! witness_settled_limit = 500
//! edge_difference_weight = 10
//! contracted_neighbours_weight = 1
//! log_interval = 10000
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use butterfly_common::{suggest_correction, Error, Result};
use serde::{Deserialize, Serialize};

use crate::ch::{DijkstraBidirectionCh, PrepareContractionHierarchies};
use crate::flags::Mode;
use crate::routing::{
    AlgorithmType, Dijkstra, DijkstraBidirection, RoutingAlgorithm, WeightCalculation,
};
use crate::storage::LevelGraph;

/// Named cost model, see [`WeightCalculation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weighting {
    #[default]
    Shortest,
    Fastest,
}

impl Weighting {
    pub fn name(&self) -> &'static str {
        match self {
            Weighting::Shortest => "shortest",
            Weighting::Fastest => "fastest",
        }
    }

    pub fn calculation(&self) -> WeightCalculation {
        match self {
            Weighting::Shortest => WeightCalculation::Shortest,
            Weighting::Fastest => WeightCalculation::Fastest,
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weighting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortest" => Ok(Weighting::Shortest),
            "fastest" => Ok(Weighting::Fastest),
            other => {
                let names = ["shortest", "fastest"];
                let msg = match suggest_correction(other, &names) {
                    Some(suggestion) => {
                        format!("unknown weighting '{s}', did you mean '{suggestion}'?")
                    }
                    None => format!("unknown weighting '{s}', expected one of: shortest, fastest"),
                };
                Err(Error::Config(msg))
            }
        }
    }
}

impl TryFrom<String> for Weighting {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Weighting> for String {
    fn from(w: Weighting) -> Self {
        w.name().to_string()
    }
}

/// Contraction tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Nodes a witness search may settle before giving up
    pub witness_settled_limit: usize,
    pub edge_difference_weight: i64,
    pub contracted_neighbours_weight: i64,
    /// Log progress every this many contracted nodes
    pub log_interval: usize,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            witness_settled_limit: 500,
            edge_difference_weight: 10,
            contracted_neighbours_weight: 1,
            log_interval: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub mode: Mode,
    pub weighting: Weighting,
    pub algorithm: AlgorithmType,
    pub prepare: PrepareConfig,
}

impl RoutingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: RoutingConfig =
            toml::from_str(s).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.prepare.witness_settled_limit == 0 {
            return Err(Error::Config(
                "prepare.witness_settled_limit must be at least 1".to_string(),
            ));
        }
        if self.prepare.log_interval == 0 {
            return Err(Error::Config(
                "prepare.log_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Contraction set up with this configuration's mode, weighting and tuning
    pub fn prepare<'g, G: LevelGraph + ?Sized>(
        &self,
        graph: &'g mut G,
    ) -> PrepareContractionHierarchies<'g, G> {
        PrepareContractionHierarchies::new(graph)
            .with_mode(self.mode)
            .with_weighting(self.weighting.calculation())
            .with_config(self.prepare.clone())
    }

    /// The configured algorithm over `graph`; `ch` needs a prepared graph
    pub fn create_algo<'g, G: LevelGraph + ?Sized>(
        &self,
        graph: &'g G,
    ) -> Result<Box<dyn RoutingAlgorithm + 'g>> {
        let weighting = self.weighting.calculation();
        Ok(match self.algorithm {
            AlgorithmType::Dijkstra => Box::new(
                Dijkstra::new(graph)
                    .with_mode(self.mode)
                    .with_weighting(weighting),
            ),
            AlgorithmType::DijkstraBidirection => Box::new(
                DijkstraBidirection::new(graph)
                    .with_mode(self.mode)
                    .with_weighting(weighting),
            ),
            AlgorithmType::DijkstraBidirectionCh => Box::new(
                DijkstraBidirectionCh::new(graph)?
                    .with_mode(self.mode)
                    .with_weighting(weighting),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RoutingConfig::from_toml_str("").unwrap();
        assert_eq!(config.mode, Mode::Car);
        assert_eq!(config.weighting, Weighting::Shortest);
        assert_eq!(config.algorithm, AlgorithmType::DijkstraBidirection);
        assert_eq!(config.prepare, PrepareConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = RoutingConfig::from_toml_str(
            r#"
            mode = "bike"
            weighting = "fastest"
            algorithm = "ch"

            [prepare]
            witness_settled_limit = 50
            log_interval = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::Bike);
        assert_eq!(config.weighting, Weighting::Fastest);
        assert_eq!(config.algorithm, AlgorithmType::DijkstraBidirectionCh);
        assert_eq!(config.prepare.witness_settled_limit, 50);
        assert_eq!(config.prepare.edge_difference_weight, 10);
        assert_eq!(config.prepare.log_interval, 100);
    }

    #[test]
    fn test_misspelled_values_get_suggestions() {
        let err = RoutingConfig::from_toml_str("mode = \"bkie\"").unwrap_err();
        assert!(err.to_string().contains("did you mean 'bike'"), "{err}");

        let err = RoutingConfig::from_toml_str("algorithm = \"bidijkstar\"").unwrap_err();
        assert!(err.to_string().contains("did you mean 'bidijkstra'"), "{err}");
    }

    #[test]
    fn test_invalid_prepare_values() {
        let err = RoutingConfig::from_toml_str("[prepare]\nwitness_settled_limit = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RoutingConfig {
            mode: Mode::Foot,
            weighting: Weighting::Fastest,
            algorithm: AlgorithmType::Dijkstra,
            prepare: PrepareConfig::default(),
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("mode = \"foot\""));
        assert_eq!(RoutingConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.toml");
        std::fs::write(&path, "algorithm = \"dijkstra\"\n").unwrap();
        let config = RoutingConfig::load(&path).unwrap();
        assert_eq!(config.algorithm, AlgorithmType::Dijkstra);

        assert!(matches!(
            RoutingConfig::load(dir.path().join("missing.toml")),
            Err(Error::Io(_))
        ));
    }
}
