use thiserror::Error;

use crate::identity::AgentAddress;

/// Failure of the direct-reply channel. Owned by the substrate, never
/// swallowed by the coordinator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no mailbox registered for {0}")]
    UnknownRecipient(AgentAddress),
    #[error("mailbox for {0} is closed")]
    MailboxClosed(AgentAddress),
}

/// Failure of the best-effort callback channel. Logged only.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AGENT_SEED not found!")]
    MissingSeed,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("result {0} must carry exactly one of result and error")]
    InconsistentResult(String),
}
