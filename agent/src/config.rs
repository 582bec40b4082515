use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use orion_engine::prelude::{EngineConfig, DEFAULT_MAX_ENSEMBLE_SIZE};

use crate::identity::AgentIdentity;
use crate::utils::errors::ConfigError;

pub const DEFAULT_AGENT_NAME: &str = "orion_simulation_agent";

#[derive(Parser, Debug, Clone)]
#[command(name = "orion-agent")]
#[command(about = "Monte Carlo simulation agent with chat guidance")]
pub struct Args {
    /// Secret seed the agent address is derived from
    #[arg(long, env = "AGENT_SEED", hide_env_values = true)]
    pub seed: Option<String>,

    /// Agent name
    #[arg(long, env = "AGENT_NAME", default_value = DEFAULT_AGENT_NAME)]
    pub name: String,

    /// Address the HTTP bridge listens on
    #[arg(long, env = "AGENT_LISTEN_ADDR", default_value = "127.0.0.1:8000")]
    pub listen_addr: SocketAddr,

    /// Callback used when a request does not carry one
    #[arg(long, env = "CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Callback timeout in seconds
    #[arg(long, env = "CALLBACK_TIMEOUT_SECS", default_value_t = 30)]
    pub callback_timeout_secs: u64,

    /// Pin the random source (reproducible results)
    #[arg(long, env = "SIMULATION_SEED")]
    pub simulation_seed: Option<u64>,

    /// Largest ensemble (time_steps x n_simulations) the engine will allocate
    #[arg(long, env = "MAX_ENSEMBLE_SIZE", default_value_t = DEFAULT_MAX_ENSEMBLE_SIZE)]
    pub max_ensemble_size: usize,
}

/// Validated runtime configuration.
#[derive(Clone)]
pub struct AgentConfig {
    seed: String,
    pub name: String,
    pub listen_addr: SocketAddr,
    pub callback_url: Option<String>,
    pub callback_timeout: Duration,
    pub engine: EngineConfig,
}

impl AgentConfig {
    /// Defaults for everything but the seed.
    pub fn for_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            name: DEFAULT_AGENT_NAME.to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            callback_url: None,
            callback_timeout: Duration::from_secs(30),
            engine: EngineConfig::default(),
        }
    }

    pub fn with_simulation_seed(mut self, seed: u64) -> Self {
        self.engine.seed = Some(seed);
        self
    }

    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::from_seed(&self.name, &self.seed)
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("seed", &"<redacted>")
            .field("name", &self.name)
            .field("listen_addr", &self.listen_addr)
            .field("callback_url", &self.callback_url)
            .field("callback_timeout", &self.callback_timeout)
            .field("engine", &self.engine)
            .finish()
    }
}

impl TryFrom<Args> for AgentConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let seed = args
            .seed
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSeed)?;
        if args.callback_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "CALLBACK_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if args.max_ensemble_size == 0 {
            return Err(ConfigError::Invalid(
                "MAX_ENSEMBLE_SIZE must be positive".to_string(),
            ));
        }
        let engine = EngineConfig {
            seed: args.simulation_seed,
            max_ensemble_size: args.max_ensemble_size,
            ..EngineConfig::default()
        };
        Ok(Self {
            seed,
            name: args.name,
            listen_addr: args.listen_addr,
            callback_url: args.callback_url.filter(|u| !u.trim().is_empty()),
            callback_timeout: Duration::from_secs(args.callback_timeout_secs),
            engine,
        })
    }
}
