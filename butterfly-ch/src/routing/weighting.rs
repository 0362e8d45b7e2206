//! Edge cost models

use std::fmt;
use std::sync::Arc;

use butterfly_common::{Error, Result};

use crate::flags::EdgeFlags;
use crate::storage::EdgeView;

type CostFn = Arc<dyn Fn(f64, EdgeFlags) -> f64 + Send + Sync>;

/// How a search turns an edge into a cost
#[derive(Clone, Default)]
pub enum WeightCalculation {
    /// Cost = distance
    #[default]
    Shortest,
    /// Cost = seconds at the edge's speed, distance taken as meters
    Fastest,
    Custom(CostFn),
}

impl WeightCalculation {
    pub fn custom(cost: impl Fn(f64, EdgeFlags) -> f64 + Send + Sync + 'static) -> Self {
        WeightCalculation::Custom(Arc::new(cost))
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeightCalculation::Shortest => "shortest",
            WeightCalculation::Fastest => "fastest",
            WeightCalculation::Custom(_) => "custom",
        }
    }

    /// Raw cost of an edge; `f64::INFINITY` means "do not traverse"
    pub fn calc_weight(&self, distance: f64, flags: EdgeFlags) -> Result<f64> {
        let weight = if flags.is_shortcut() {
            distance
        } else {
            match self {
                WeightCalculation::Shortest => distance,
                WeightCalculation::Fastest => {
                    let speed = flags.speed_kmh();
                    if speed == 0 {
                        f64::INFINITY
                    } else {
                        distance / (speed as f64 / 3.6)
                    }
                }
                WeightCalculation::Custom(cost) => cost(distance, flags),
            }
        };

        if weight.is_nan() || weight < 0.0 {
            return Err(Error::InvalidWeight(weight));
        }
        Ok(weight)
    }

    #[inline]
    pub fn weight(&self, edge: &EdgeView) -> Result<f64> {
        self.calc_weight(edge.distance(), edge.flags())
    }
}

impl fmt::Debug for WeightCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
