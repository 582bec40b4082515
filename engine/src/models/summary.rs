use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::math::statistics::{mean, percentiles, population_std_dev};
use crate::prelude::*;

/// Number of terminal prices echoed back to the caller.
pub const FINAL_PRICES_SAMPLE_SIZE: usize = 10;

/// Statistical summary of the terminal price distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub mean_price: f64,
    pub std_dev: f64,
    /// `[p5, p95]`
    pub confidence_interval: [f64; 2],
    pub final_prices_sample: Vec<f64>,
    pub simulation_timestamp: DateTime<Utc>,
    pub parameters_used: SimulationParameters,
}

impl SimulationSummary {
    /// Summarise the last row of `ensemble`.
    pub fn from_ensemble(
        ensemble: &PriceEnsemble,
        parameters_used: SimulationParameters,
        simulation_timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let final_prices = ensemble.final_prices();
        if let Some(bad) = final_prices.iter().find(|p| !p.is_finite()) {
            return Err(EngineError::Computation(format!(
                "overflow encountered in simulated prices ({bad})"
            )));
        }

        let mean_price = mean(final_prices);
        let std_dev = population_std_dev(final_prices);
        let bounds = percentiles(final_prices, &[5.0, 95.0]);
        if !mean_price.is_finite() || !std_dev.is_finite() {
            return Err(EngineError::Computation(
                "invalid value encountered in summary statistics".to_string(),
            ));
        }

        Ok(Self {
            mean_price,
            std_dev,
            confidence_interval: [bounds[0], bounds[1]],
            final_prices_sample: final_prices
                .iter()
                .take(FINAL_PRICES_SAMPLE_SIZE)
                .copied()
                .collect(),
            simulation_timestamp,
            parameters_used,
        })
    }

    pub fn lower_bound(&self) -> f64 {
        self.confidence_interval[0]
    }

    pub fn upper_bound(&self) -> f64 {
        self.confidence_interval[1]
    }
}
