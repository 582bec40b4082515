use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::prelude::*;

/// Ensembles above this many cells are refused instead of allocated.
pub const DEFAULT_MAX_ENSEMBLE_SIZE: usize = 100_000_000;

/// Anything able to turn raw parameters into a summary.
pub trait Simulator: Send + Sync {
    fn simulate(&self, parameters: &RawParameters) -> Result<SimulationSummary>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub defaults: SimulationDefaults,
    pub seed: Option<u64>,
    pub max_ensemble_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: SimulationDefaults::default(),
            seed: None,
            max_ensemble_size: DEFAULT_MAX_ENSEMBLE_SIZE,
        }
    }
}

/// Monte Carlo engine for GBM price paths.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    config: EngineConfig,
}

impl MonteCarloEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_defaults(mut self, defaults: SimulationDefaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    pub fn with_max_ensemble_size(mut self, max_ensemble_size: usize) -> Self {
        self.config.max_ensemble_size = max_ensemble_size;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn defaults(&self) -> &SimulationDefaults {
        &self.config.defaults
    }

    /// Same as [`Simulator::simulate`] with a caller supplied completion stamp.
    pub fn simulate_at(
        &self,
        parameters: &RawParameters,
        timestamp: DateTime<Utc>,
    ) -> Result<SimulationSummary> {
        self.run(parameters, || timestamp).map_err(|e| {
            error!("Simulation error: {}", e);
            e
        })
    }

    fn run(
        &self,
        raw: &RawParameters,
        now: impl FnOnce() -> DateTime<Utc>,
    ) -> Result<SimulationSummary> {
        let params = raw.resolve(&self.config.defaults)?;
        params.validate()?;

        let cells = params
            .time_steps
            .checked_mul(params.n_simulations)
            .filter(|cells| *cells <= self.config.max_ensemble_size)
            .ok_or_else(|| {
                EngineError::Computation(format!(
                    "ensemble of {} x {} exceeds the limit of {} prices",
                    params.time_steps, params.n_simulations, self.config.max_ensemble_size
                ))
            })?;
        debug!(
            time_steps = params.time_steps,
            n_simulations = params.n_simulations,
            cells,
            "simulating GBM ensemble"
        );

        let model = match self.config.seed {
            Some(seed) => GeometricBrownianMotion::new().with_seed(seed),
            None => GeometricBrownianMotion::new(),
        };
        let ensemble = model.simulate(&params);
        SimulationSummary::from_ensemble(&ensemble, params, now())
    }
}

impl Simulator for MonteCarloEngine {
    fn simulate(&self, parameters: &RawParameters) -> Result<SimulationSummary> {
        self.run(parameters, Utc::now).map_err(|e| {
            error!("Simulation error: {}", e);
            e
        })
    }
}
