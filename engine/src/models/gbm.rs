//! Geometric Brownian motion path generator.
//!
//! Every path starts at `S₀` and is advanced with the exact log-normal step
//!
//! **S<sub>t</sub> = S<sub>t-1</sub> · exp((μ − σ²/2)·Δt + σ·√Δt·Z)**, Z ~ N(0,1)
//!
//! so the only discretisation is the sampling of the Wiener increment.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::prelude::*;

/// Paths per row above which the step update is spread over the rayon pool.
const PARALLEL_UPDATE_THRESHOLD: usize = 4096;

/// Dense `time_steps × n_simulations` grid of simulated prices, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEnsemble {
    time_steps: usize,
    n_simulations: usize,
    prices: Vec<f64>,
}

impl PriceEnsemble {
    fn filled(time_steps: usize, n_simulations: usize, initial_price: f64) -> Self {
        let mut prices = vec![0.0; time_steps * n_simulations];
        prices[..n_simulations].fill(initial_price);
        Self {
            time_steps,
            n_simulations,
            prices,
        }
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn n_simulations(&self) -> usize {
        self.n_simulations
    }

    /// Prices of every path at step `t`.
    pub fn row(&self, t: usize) -> &[f64] {
        let start = t * self.n_simulations;
        &self.prices[start..start + self.n_simulations]
    }

    /// Terminal prices in simulation-index order.
    pub fn final_prices(&self) -> &[f64] {
        self.row(self.time_steps - 1)
    }
}

/// Monte-Carlo generator for a single GBM asset.
#[derive(Clone, Debug, Default)]
pub struct GeometricBrownianMotion {
    pub seed: Option<u64>,
}

impl GeometricBrownianMotion {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Generate the full ensemble. `params` must already be validated.
    ///
    /// Shocks for step `t` are drawn for simulations `0..n` in order before
    /// the step is applied, so the output does not depend on whether the
    /// update ran in parallel.
    pub fn simulate(&self, params: &SimulationParameters) -> PriceEnsemble {
        let n = params.n_simulations;
        let dt = params.dt();
        let drift_term = (params.drift - 0.5 * params.volatility * params.volatility) * dt;
        let diffusion = params.volatility * dt.sqrt();

        let mut ensemble = PriceEnsemble::filled(params.time_steps, n, params.initial_price);
        let mut rng = self.rng();
        let mut shocks = vec![0.0; n];

        for t in 1..params.time_steps {
            shocks
                .iter_mut()
                .for_each(|z| *z = rng.sample::<f64, _>(StandardNormal));

            let (done, rest) = ensemble.prices.split_at_mut(t * n);
            let prev = &done[(t - 1) * n..];
            let next = &mut rest[..n];

            let step = |((s, s_prev), z): ((&mut f64, &f64), &f64)| {
                *s = s_prev * (drift_term + diffusion * z).exp();
            };
            if n >= PARALLEL_UPDATE_THRESHOLD {
                next.par_iter_mut()
                    .zip(prev.par_iter())
                    .zip(shocks.par_iter())
                    .for_each(step);
            } else {
                next.iter_mut().zip(prev.iter()).zip(shocks.iter()).for_each(step);
            }
        }
        ensemble
    }
}
