//! Runs one simulation request to completion and delivers its result.
//!
//! Every request walks `Received → Validated → Computing → ResultReady →
//! Delivering → Done` exactly once. Two deliveries follow the computation:
//!
//! * the callback, optional and best-effort, run on its own task under a
//!   deadline, whose failures (panics included) are logged and otherwise ignored;
//! * the direct reply through the [`Transport`], whose failure is handed
//!   back to the caller as a [`TransportError`].

use std::sync::Arc;
use std::time::Duration;

use orion_engine::prelude::Simulator;
use tracing::{debug, error, info, warn};

use crate::callback::{CallbackSink, DEFAULT_CALLBACK_TIMEOUT};
use crate::identity::AgentAddress;
use crate::messages::{SimulationRequest, SimulationResult, MONTE_CARLO};
use crate::transport::Transport;
use crate::utils::errors::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    Received,
    Validated,
    Computing,
    ResultReady,
    Delivering,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Neither the request nor the configuration named a callback.
    Skipped,
    Delivered { status: u16 },
    Failed(String),
}

/// What happened to a request that reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub result: SimulationResult,
    pub callback: CallbackOutcome,
    pub stages: Vec<DeliveryStage>,
}

struct StageTrail<'a> {
    request_id: &'a str,
    stages: Vec<DeliveryStage>,
}

impl<'a> StageTrail<'a> {
    fn start(request_id: &'a str) -> Self {
        let mut trail = Self {
            request_id,
            stages: Vec::with_capacity(6),
        };
        trail.advance(DeliveryStage::Received);
        trail
    }

    fn advance(&mut self, stage: DeliveryStage) {
        debug!(request_id = self.request_id, ?stage, "simulation request stage");
        self.stages.push(stage);
    }
}

#[derive(Clone)]
pub struct SimulationCoordinator {
    simulator: Arc<dyn Simulator>,
    callback: Arc<dyn CallbackSink>,
    transport: Arc<dyn Transport>,
    default_callback_url: Option<String>,
    callback_deadline: Duration,
}

impl SimulationCoordinator {
    pub fn new(
        simulator: Arc<dyn Simulator>,
        callback: Arc<dyn CallbackSink>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            simulator,
            callback,
            transport,
            default_callback_url: None,
            callback_deadline: DEFAULT_CALLBACK_TIMEOUT,
        }
    }

    pub fn with_default_callback_url(mut self, url: Option<String>) -> Self {
        self.default_callback_url = url;
        self
    }

    pub fn with_callback_deadline(mut self, deadline: Duration) -> Self {
        self.callback_deadline = deadline;
        self
    }

    /// Handle one inbound request from `sender`.
    pub async fn handle(
        &self,
        sender: &AgentAddress,
        request: SimulationRequest,
    ) -> Result<DeliveryReport, TransportError> {
        self.handle_via(sender, request, self.transport.as_ref()).await
    }

    /// Same as [`handle`](Self::handle), with the direct reply sent through
    /// `reply` instead of the coordinator's own transport.
    pub async fn handle_via(
        &self,
        sender: &AgentAddress,
        request: SimulationRequest,
        reply: &dyn Transport,
    ) -> Result<DeliveryReport, TransportError> {
        let request_id = request.request_id();
        info!(request_id, %sender, "Received simulation request");
        let mut trail = StageTrail::start(request_id);

        let result = self.build_result(&request, &mut trail).await;
        trail.advance(DeliveryStage::ResultReady);

        trail.advance(DeliveryStage::Delivering);
        let callback = self.deliver_callback(&request, &result).await;

        if let Err(e) = reply.send(sender, result.clone().into()).await {
            error!(request_id, %sender, "Direct reply failed: {}", e);
            return Err(e);
        }
        trail.advance(DeliveryStage::Done);

        Ok(DeliveryReport {
            result,
            callback,
            stages: trail.stages,
        })
    }

    async fn build_result(
        &self,
        request: &SimulationRequest,
        trail: &mut StageTrail<'_>,
    ) -> SimulationResult {
        let request_id = request.request_id();
        if request.simulation_type() != MONTE_CARLO {
            warn!(
                request_id,
                simulation_type = request.simulation_type(),
                "Rejecting simulation request"
            );
            return SimulationResult::failed(
                request_id,
                format!("Unsupported simulation type: {}", request.simulation_type()),
            );
        }
        trail.advance(DeliveryStage::Validated);

        trail.advance(DeliveryStage::Computing);
        let simulator = Arc::clone(&self.simulator);
        let parameters = request.parameters().clone();
        match tokio::task::spawn_blocking(move || simulator.simulate(&parameters)).await {
            Ok(Ok(summary)) => SimulationResult::succeeded(request_id, summary),
            Ok(Err(e)) => SimulationResult::failed(request_id, e.to_string()),
            Err(e) => {
                error!(request_id, "Error processing simulation: {}", e);
                SimulationResult::failed(request_id, format!("Processing error: {e}"))
            }
        }
    }

    async fn deliver_callback(
        &self,
        request: &SimulationRequest,
        result: &SimulationResult,
    ) -> CallbackOutcome {
        let request_id = request.request_id();
        let url = request
            .callback_url()
            .filter(|u| !u.trim().is_empty())
            .or(self.default_callback_url.as_deref());
        let Some(url) = url else {
            debug!(request_id, "no callback url, skipping callback");
            return CallbackOutcome::Skipped;
        };

        let callback = Arc::clone(&self.callback);
        let deadline = self.callback_deadline;
        let target = url.to_string();
        let payload = result.clone();
        let delivery = tokio::spawn(async move {
            tokio::time::timeout(deadline, callback.deliver(&target, &payload)).await
        });

        match delivery.await {
            Ok(Ok(Ok(status))) => {
                info!(request_id, status, "Callback status: {}", status);
                CallbackOutcome::Delivered { status }
            }
            Ok(Ok(Err(e))) => {
                error!(request_id, url, "Callback failed: {}", e);
                CallbackOutcome::Failed(e.to_string())
            }
            Ok(Err(_)) => {
                error!(request_id, url, "Callback failed: no response within {:?}", deadline);
                CallbackOutcome::Failed(format!("callback timed out after {deadline:?}"))
            }
            Err(e) => {
                error!(request_id, url, "Callback failed: {}", e);
                CallbackOutcome::Failed(format!("callback aborted: {e}"))
            }
        }
    }
}
