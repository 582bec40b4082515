//! Monte Carlo engine for geometric Brownian motion price paths.
//!
//! ```no_run
//! use orion_engine::prelude::*;
//!
//! let engine = MonteCarloEngine::default().with_seed(42);
//! let summary = engine
//!     .simulate(&RawParameters::new().with_n_simulations(500))
//!     .unwrap();
//! println!("{} [{}, {}]", summary.mean_price, summary.lower_bound(), summary.upper_bound());
//! ```

pub mod math;
pub mod models;
pub mod prelude;
pub mod utils;
