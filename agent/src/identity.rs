use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const ADDRESS_PREFIX: &str = "agent1q";

/// Address of a peer on the messaging substrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentAddress(String);

impl AgentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Name and network address of this agent. The address is a pure function of
/// the secret seed, so restarting with the same seed keeps the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    name: String,
    address: AgentAddress,
}

impl AgentIdentity {
    pub fn from_seed(name: impl Into<String>, seed: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(b"orion-agent-identity")
            .chain_update(seed.as_bytes())
            .finalize();
        Self {
            name: name.into(),
            address: AgentAddress(format!("{ADDRESS_PREFIX}{}", hex::encode(&digest[..20]))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &AgentAddress {
        &self.address
    }
}
