//! Orion simulation agent: runs GBM Monte Carlo requests and answers chat
//! messages over a pluggable messaging substrate.

pub mod agent;
pub mod callback;
pub mod chat;
pub mod config;
pub mod coordinator;
pub mod identity;
pub mod messages;
pub mod prelude;
pub mod server;
pub mod transport;
pub mod utils;
