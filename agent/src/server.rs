//! HTTP bridge onto the agent.
//!
//! `POST /submit` takes an [`Envelope`], dispatches it to the agent through a
//! [`ReplySlot`] owned by that call and answers with the reply. Concurrent
//! submissions from one sender address never share a slot.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::messages::{Envelope, OutboundMessage, ProtocolSpec, CHAT_PROTOCOL, SIMULATION_PROTOCOL};
use crate::transport::ReplySlot;

#[derive(Clone)]
pub struct BridgeState {
    agent: Arc<Agent>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub name: String,
    pub address: String,
    pub protocols: Vec<ProtocolSpec>,
}

pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/submit", post(submit))
        .with_state(BridgeState { agent })
}

pub async fn serve(addr: SocketAddr, agent: Arc<Agent>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP bridge listening on {}", listener.local_addr()?);
    axum::serve(listener, router(agent)).await?;
    Ok(())
}

async fn health(State(state): State<BridgeState>) -> Json<HealthResponse> {
    let identity = state.agent.identity();
    Json(HealthResponse {
        name: identity.name().to_string(),
        address: identity.address().to_string(),
        protocols: vec![SIMULATION_PROTOCOL, CHAT_PROTOCOL],
    })
}

async fn submit(
    State(state): State<BridgeState>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<OutboundMessage>, (StatusCode, String)> {
    let sender = envelope.sender.clone();
    let (slot, mut inbox) = ReplySlot::open(sender.clone());

    if let Err(e) = state.agent.dispatch_via(envelope, &slot).await {
        warn!(%sender, "dispatch failed: {}", e);
        return Err((StatusCode::BAD_GATEWAY, e.to_string()));
    }

    inbox.try_recv().map(Json).map_err(|_| {
        (
            StatusCode::BAD_GATEWAY,
            format!("agent sent no reply to {sender}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::AgentConfig;
    use crate::transport::MailboxTransport;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AgentConfig::for_seed("bridge seed").with_simulation_seed(4);
        let agent = Agent::from_config(&config, Arc::new(MailboxTransport::new())).unwrap();
        router(Arc::new(agent))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_identity() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "orion_simulation_agent");
        assert!(body["address"].as_str().unwrap().starts_with("agent1q"));
        assert_eq!(body["protocols"][0]["name"], "OrionSimulation");
    }

    #[tokio::test]
    async fn test_submit_returns_direct_reply() {
        let envelope = json!({
            "sender": "agent1qhttpclient",
            "message": {
                "type": "simulation_request",
                "simulation_type": "monte_carlo",
                "parameters": { "time_steps": 8, "n_simulations": 16 },
                "request_id": "http-1"
            }
        });
        let response = app()
            .oneshot(
                Request::post("/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(envelope.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "simulation_result");
        assert_eq!(body["request_id"], "http-1");
        assert_eq!(body["success"], true);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["result"]["parameters_used"]["n_simulations"], 16);
    }

    fn submit_request(envelope: Value) -> Request<Body> {
        Request::post("/submit")
            .header("content-type", "application/json")
            .body(Body::from(envelope.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_submits_from_one_sender_each_get_their_reply() {
        let app = app();
        let simulation = json!({
            "sender": "agent1qshared",
            "message": {
                "type": "simulation_request",
                "simulation_type": "monte_carlo",
                "parameters": { "time_steps": 252, "n_simulations": 5000 },
                "request_id": "shared-sim"
            }
        });
        let chat = json!({
            "sender": "agent1qshared",
            "message": { "type": "chat_message", "text": "hello" }
        });

        let slow = app.clone().oneshot(submit_request(simulation));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            app.clone().oneshot(submit_request(chat)).await
        };
        let (slow, fast) = tokio::join!(slow, fast);
        let (slow, fast) = (slow.unwrap(), fast.unwrap());

        assert_eq!(slow.status(), StatusCode::OK);
        assert_eq!(fast.status(), StatusCode::OK);
        let slow = body_json(slow).await;
        assert_eq!(slow["type"], "simulation_result");
        assert_eq!(slow["request_id"], "shared-sim");
        assert_eq!(slow["success"], true);
        assert_eq!(body_json(fast).await["type"], "chat_response");
    }
}
