use chrono::{DateTime, Utc};
use orion_engine::prelude::{RawParameters, SimulationParameters, SimulationSummary};
use serde::{Deserialize, Serialize};

use crate::identity::AgentAddress;
use crate::utils::errors::MessageError;

/// The only simulation kind the agent runs.
pub const MONTE_CARLO: &str = "monte_carlo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolSpec {
    pub name: &'static str,
    pub version: &'static str,
}

pub const SIMULATION_PROTOCOL: ProtocolSpec = ProtocolSpec {
    name: "OrionSimulation",
    version: "1.0",
};

pub const CHAT_PROTOCOL: ProtocolSpec = ProtocolSpec {
    name: "OrionChat",
    version: "1.0",
};

/// A unit of simulation work as received from the substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    simulation_type: String,
    #[serde(default)]
    parameters: RawParameters,
    request_id: String,
    #[serde(default)]
    callback_url: Option<String>,
}

impl SimulationRequest {
    pub fn new(
        simulation_type: impl Into<String>,
        parameters: RawParameters,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            simulation_type: simulation_type.into(),
            parameters,
            request_id: request_id.into(),
            callback_url: None,
        }
    }

    pub fn monte_carlo(parameters: RawParameters, request_id: impl Into<String>) -> Self {
        Self::new(MONTE_CARLO, parameters, request_id)
    }

    pub fn with_callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = Some(callback_url.into());
        self
    }

    pub fn simulation_type(&self) -> &str {
        &self.simulation_type
    }

    pub fn parameters(&self) -> &RawParameters {
        &self.parameters
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.callback_url.as_deref()
    }
}

/// Wire shape of a result, checked before it becomes a [`SimulationResult`].
#[derive(Deserialize)]
struct ResultFields {
    request_id: String,
    success: bool,
    #[serde(default)]
    result: Option<SimulationSummary>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    signature: Option<String>,
}

/// Terminal outcome of one request. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResultFields")]
pub struct SimulationResult {
    request_id: String,
    success: bool,
    result: Option<SimulationSummary>,
    error: Option<String>,
    signature: Option<String>,
}

impl SimulationResult {
    pub fn succeeded(request_id: impl Into<String>, summary: SimulationSummary) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            result: Some(summary),
            error: None,
            signature: None,
        }
    }

    pub fn failed(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            request_id: request_id.into(),
            success: false,
            result: None,
            error: Some(if error.is_empty() {
                "unknown error".to_string()
            } else {
                error
            }),
            signature: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn result(&self) -> Option<&SimulationSummary> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }
}

impl TryFrom<ResultFields> for SimulationResult {
    type Error = MessageError;

    fn try_from(f: ResultFields) -> Result<Self, Self::Error> {
        let consistent = match (&f.result, &f.error) {
            (Some(_), None) => f.success,
            (None, Some(e)) => !f.success && !e.is_empty(),
            _ => false,
        };
        if !consistent {
            return Err(MessageError::InconsistentResult(f.request_id));
        }
        Ok(Self {
            request_id: f.request_id,
            success: f.success,
            result: f.result,
            error: f.error,
            signature: f.signature,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            session_id: None,
            timestamp: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requires_parameters: bool,
    #[serde(default)]
    pub parameter_template: Option<SimulationParameters>,
}

/// Messages the agent accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    SimulationRequest(SimulationRequest),
    ChatMessage(ChatMessage),
}

/// Messages the agent sends back to a sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    SimulationResult(SimulationResult),
    ChatResponse(ChatResponse),
}

impl From<SimulationResult> for OutboundMessage {
    fn from(r: SimulationResult) -> Self {
        OutboundMessage::SimulationResult(r)
    }
}

impl From<ChatResponse> for OutboundMessage {
    fn from(r: ChatResponse) -> Self {
        OutboundMessage::ChatResponse(r)
    }
}

/// An inbound message together with its return address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: AgentAddress,
    pub message: InboundMessage,
}
