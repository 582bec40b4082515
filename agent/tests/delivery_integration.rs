use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use orion_agent::prelude::*;
use orion_engine::prelude::RawParameters;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Starts a callback receiver that forwards (content-type, body) pairs.
async fn callback_receiver() -> (String, mpsc::UnboundedReceiver<(String, Value)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(
            "/callback",
            post(
                |State(tx): State<mpsc::UnboundedSender<(String, Value)>>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let _ = tx.send((content_type, body));
                    "ok"
                },
            ),
        )
        .with_state(tx);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/callback"), rx)
}

fn agent_with(mailboxes: &MailboxTransport) -> Agent {
    let config = AgentConfig::for_seed("integration").with_simulation_seed(1234);
    Agent::from_config(&config, Arc::new(mailboxes.clone())).unwrap()
}

#[tokio::test]
async fn test_result_reaches_callback_and_sender() {
    let (callback_url, mut callbacks) = callback_receiver().await;
    let mailboxes = MailboxTransport::new();
    let agent = agent_with(&mailboxes);
    let sender = AgentAddress::from("agent1qintegration");
    let mut inbox = mailboxes.register(sender.clone());

    let request = SimulationRequest::monte_carlo(
        RawParameters::new().with_time_steps(30).with_n_simulations(200),
        "int-1",
    )
    .with_callback_url(callback_url);
    agent
        .dispatch(Envelope {
            sender,
            message: InboundMessage::SimulationRequest(request),
        })
        .await
        .unwrap();

    let reply = match inbox.recv().await {
        Some(OutboundMessage::SimulationResult(result)) => result,
        other => panic!("unexpected reply {other:?}"),
    };
    let (content_type, body) = callbacks.recv().await.unwrap();
    assert_eq!(content_type, "application/json");
    assert_eq!(body["request_id"], "int-1");
    let posted_mean = body["result"]["mean_price"].as_f64().unwrap();
    assert!((posted_mean - reply.result().unwrap().mean_price).abs() < 1e-9);
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["success"], true);
    assert_eq!(body["signature"], Value::Null);

    let summary = reply.result().unwrap();
    assert!(summary.confidence_interval[0] <= summary.confidence_interval[1]);
    assert_eq!(summary.final_prices_sample.len(), 10);
}

#[tokio::test]
async fn test_same_seed_same_summary_across_agents() {
    let mailboxes = MailboxTransport::new();
    let first = agent_with(&mailboxes);
    let second = agent_with(&mailboxes);
    let sender = AgentAddress::from("agent1qdeterminism");
    let mut inbox = mailboxes.register(sender.clone());

    for agent in [&first, &second] {
        let request = SimulationRequest::monte_carlo(RawParameters::new(), "det");
        agent
            .dispatch(Envelope {
                sender: sender.clone(),
                message: InboundMessage::SimulationRequest(request),
            })
            .await
            .unwrap();
    }

    let mut summaries = Vec::new();
    for _ in 0..2 {
        match inbox.recv().await {
            Some(OutboundMessage::SimulationResult(r)) => summaries.push(r.result().unwrap().clone()),
            other => panic!("unexpected reply {other:?}"),
        }
    }
    assert_eq!(summaries[0].mean_price.to_bits(), summaries[1].mean_price.to_bits());
    assert_eq!(summaries[0].std_dev.to_bits(), summaries[1].std_dev.to_bits());
    assert_eq!(summaries[0].confidence_interval, summaries[1].confidence_interval);
    assert_eq!(summaries[0].final_prices_sample, summaries[1].final_prices_sample);
}

#[tokio::test]
async fn test_failed_callback_still_replies() {
    let mailboxes = MailboxTransport::new();
    let agent = agent_with(&mailboxes);
    let sender = AgentAddress::from("agent1qcallbackdown");
    let mut inbox = mailboxes.register(sender.clone());

    let request = SimulationRequest::monte_carlo(
        RawParameters::new().with_time_steps(5).with_n_simulations(5),
        "int-down",
    )
    .with_callback_url("http://127.0.0.1:9/down");
    agent
        .dispatch(Envelope {
            sender,
            message: InboundMessage::SimulationRequest(request),
        })
        .await
        .unwrap();

    match inbox.recv().await {
        Some(OutboundMessage::SimulationResult(result)) => {
            assert!(result.success());
            assert_eq!(result.result().unwrap().final_prices_sample.len(), 5);
        }
        other => panic!("unexpected reply {other:?}"),
    }
}
