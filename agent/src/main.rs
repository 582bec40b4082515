use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orion_agent::prelude::*;
use orion_agent::server;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orion_agent=info,orion_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = match AgentConfig::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let agent = Arc::new(Agent::from_config(
        &config,
        Arc::new(MailboxTransport::new()),
    )?);

    info!("Starting Orion Hybrid Agent (Chat + Simulation)...");
    info!("Agent name: {}", agent.identity().name());
    info!("Agent address: {}", agent.identity().address());
    if let Some(url) = &config.callback_url {
        info!("Default callback: {}", url);
    }

    server::serve(config.listen_addr, agent).await
}
