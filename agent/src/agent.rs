use std::sync::Arc;

use orion_engine::prelude::MonteCarloEngine;
use tracing::{error, info};

use crate::callback::HttpCallback;
use crate::chat::ChatHandler;
use crate::config::AgentConfig;
use crate::coordinator::SimulationCoordinator;
use crate::identity::{AgentAddress, AgentIdentity};
use crate::messages::{ChatMessage, Envelope, InboundMessage, CHAT_PROTOCOL, SIMULATION_PROTOCOL};
use crate::transport::Transport;
use crate::utils::errors::{CallbackError, TransportError};

/// Routes inbound messages to the simulation and chat protocols.
pub struct Agent {
    identity: AgentIdentity,
    coordinator: SimulationCoordinator,
    chat: ChatHandler,
    transport: Arc<dyn Transport>,
}

impl Agent {
    pub fn new(
        identity: AgentIdentity,
        coordinator: SimulationCoordinator,
        chat: ChatHandler,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            coordinator,
            chat,
            transport,
        }
    }

    /// Wire the engine, the HTTP callback and `transport` together from `config`.
    pub fn from_config(
        config: &AgentConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CallbackError> {
        let engine = MonteCarloEngine::new(config.engine.clone());
        let callback = HttpCallback::new(config.callback_timeout)?;
        let coordinator =
            SimulationCoordinator::new(Arc::new(engine), Arc::new(callback), transport.clone())
                .with_default_callback_url(config.callback_url.clone())
                .with_callback_deadline(config.callback_timeout);
        let chat = ChatHandler::new(config.engine.defaults);
        Ok(Self::new(config.identity(), coordinator, chat, transport))
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub async fn dispatch(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.dispatch_via(envelope, self.transport.as_ref()).await
    }

    /// Dispatch `envelope` and send every reply through `reply`.
    pub async fn dispatch_via(
        &self,
        envelope: Envelope,
        reply: &dyn Transport,
    ) -> Result<(), TransportError> {
        let Envelope { sender, message } = envelope;
        match message {
            InboundMessage::SimulationRequest(request) => {
                info!(protocol = SIMULATION_PROTOCOL.name, %sender, "dispatching");
                self.coordinator
                    .handle_via(&sender, request, reply)
                    .await
                    .map(|_| ())
            }
            InboundMessage::ChatMessage(message) => {
                info!(protocol = CHAT_PROTOCOL.name, %sender, "dispatching");
                self.handle_chat(&sender, message, reply).await
            }
        }
    }

    async fn handle_chat(
        &self,
        sender: &AgentAddress,
        message: ChatMessage,
        reply: &dyn Transport,
    ) -> Result<(), TransportError> {
        info!(
            user_id = message.user_id.as_deref().unwrap_or("unknown"),
            "Received chat: {}",
            message.text
        );
        let response = self.chat.respond(&message);
        if let Err(e) = reply.send(sender, response.into()).await {
            error!(%sender, "Error handling chat: {}", e);
            return reply.send(sender, self.chat.fallback(&message).into()).await;
        }
        Ok(())
    }
}
