use chrono::Utc;
use orion_engine::prelude::{SimulationDefaults, SimulationParameters};

use crate::messages::{ChatMessage, ChatResponse};

const GREETINGS: [&str; 4] = ["hello", "hi", "hey", "hola"];

pub const FALLBACK_RESPONSE: &str = "Sorry, I encountered an error processing your message.";

/// What the user appears to be asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIntent {
    Greeting,
    MonteCarlo,
    ParameterHelp,
    Thanks,
    Unknown,
}

impl ChatIntent {
    /// First matching keyword wins, in declaration order.
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        if GREETINGS.iter().any(|g| text.contains(g)) {
            ChatIntent::Greeting
        } else if text.contains("monte carlo") {
            ChatIntent::MonteCarlo
        } else if text.contains("parameter") || text.contains("how to") {
            ChatIntent::ParameterHelp
        } else if text.contains("thank") {
            ChatIntent::Thanks
        } else {
            ChatIntent::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub requires_parameters: bool,
    pub parameter_template: Option<SimulationParameters>,
}

impl ChatReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requires_parameters: false,
            parameter_template: None,
        }
    }
}

/// Canned answers for the chat protocol.
#[derive(Debug, Clone, Default)]
pub struct ChatHandler {
    defaults: SimulationDefaults,
}

impl ChatHandler {
    pub fn new(defaults: SimulationDefaults) -> Self {
        Self { defaults }
    }

    pub fn reply(&self, text: &str) -> ChatReply {
        match ChatIntent::classify(text) {
            ChatIntent::Greeting => ChatReply::text(
                "Hello! I'm Orion Simulation Agent! I can help you with financial simulations using Monte Carlo methods.",
            ),
            ChatIntent::MonteCarlo => ChatReply {
                text: "I can run Monte Carlo simulations! Please provide parameters like this:"
                    .to_string(),
                requires_parameters: true,
                parameter_template: Some(self.defaults.as_parameters()),
            },
            ChatIntent::ParameterHelp => ChatReply::text(format!(
                "Please provide parameters in this format:\n{}",
                self.parameter_format()
            )),
            ChatIntent::Thanks => {
                ChatReply::text("You're welcome! Let me know if you need more simulations.")
            }
            ChatIntent::Unknown => ChatReply::text(
                "I'm a financial simulation agent. I can run Monte Carlo simulations for you. Try asking about 'Monte Carlo' or 'parameters'!",
            ),
        }
    }

    pub fn respond(&self, message: &ChatMessage) -> ChatResponse {
        let reply = self.reply(&message.text);
        ChatResponse {
            response: reply.text,
            session_id: message.session_id.clone(),
            timestamp: Some(Utc::now()),
            requires_parameters: reply.requires_parameters,
            parameter_template: reply.parameter_template,
        }
    }

    /// Response sent when handling a chat message fails.
    pub fn fallback(&self, message: &ChatMessage) -> ChatResponse {
        ChatResponse {
            response: FALLBACK_RESPONSE.to_string(),
            session_id: message.session_id.clone(),
            timestamp: Some(Utc::now()),
            requires_parameters: false,
            parameter_template: None,
        }
    }

    fn parameter_format(&self) -> String {
        let p = self.defaults.as_parameters();
        format!(
            "{{\n  \"initial_price\": {:.1},\n  \"drift\": {},\n  \"volatility\": {},\n  \"time_horizon\": {:.1},\n  \"time_steps\": {},\n  \"n_simulations\": {}\n}}",
            p.initial_price, p.drift, p.volatility, p.time_horizon, p.time_steps, p.n_simulations
        )
    }
}
