// system-tests/tests/http_surface.rs
// ============================================================================
// Module: HTTP Surface Tests
// Description: Over-the-wire checks for the v1 decision surface.
// ============================================================================
//! Decide, replay, feedback, health, and scenario listing against a live
//! server on an ephemeral port.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod helpers;

use helpers::harness::demo_engine;
use helpers::harness::spawn_server;
use helpers::scenarios::notification_action;
use helpers::scenarios::notification_request;
use serde_json::Value;
use serde_json::json;

/// Posts one decision and returns the parsed response body.
async fn decide(base: &str, client: &reqwest::Client) -> Value {
    let request = notification_request(vec![
        notification_action("send-now", "immediate"),
        notification_action("delay-1h", "delayed"),
    ]);
    let response = client
        .post(format!("{base}/v1/decide"))
        .json(&request)
        .send()
        .await
        .expect("send decide");
    assert_eq!(response.status(), 200);
    response.json().await.expect("decision body")
}

#[tokio::test(flavor = "multi_thread")]
async fn decide_returns_the_full_response_shape() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let body = decide(&base, &client).await;

    assert_eq!(body["decision"]["selected_action"], json!("send-now"));
    assert_eq!(body["meta"]["api_version"], json!("v1"));
    assert_eq!(body["execution"]["fallback_used"], json!(false));
    assert_eq!(body["meta"]["request_id"], body["decision"]["decision_id"]);
    assert!(body["audit"]["replay_token"].as_str().expect("token").starts_with("rpl_"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_requests_are_400() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();

    // Missing context.current_time.
    let mut request = notification_request(vec![notification_action("send-now", "immediate")]);
    request.context.current_time = None;
    let response = client
        .post(format!("{base}/v1/decide"))
        .json(&request)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("body");
    assert_eq!(body["error"]["code"], json!("INVALID_REQUEST"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_scenario_is_404() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let mut request = notification_request(vec![notification_action("send-now", "immediate")]);
    request.scenario_id = "ghost".into();
    let response = client
        .post(format!("{base}/v1/decide"))
        .json(&request)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_action_type_is_400() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let mut request = notification_request(vec![notification_action("send-now", "immediate")]);
    request.actions[0].type_id = "ghost-type".into();
    let response = client
        .post(format!("{base}/v1/decide"))
        .json(&request)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("body");
    assert_eq!(body["error"]["code"], json!("INVALID_ACTION_TYPE"));
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_returns_the_frozen_trace_read_only() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let decision = decide(&base, &client).await;
    let decision_id = decision["decision"]["decision_id"].as_str().expect("id");

    let response = client
        .get(format!("{base}/v1/replay/{decision_id}"))
        .send()
        .await
        .expect("send replay");
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("x-replay-only")
            .and_then(|value| value.to_str().ok()),
        Some("true")
    );
    let trace: Value = response.json().await.expect("trace body");
    assert_eq!(trace["decision_id"], decision["decision"]["decision_id"]);
    assert_eq!(
        trace["final_response"]["decision"]["selected_action"],
        decision["decision"]["selected_action"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_accepts_the_token_form() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let decision = decide(&base, &client).await;
    let token = decision["audit"]["replay_token"].as_str().expect("token");

    let response = client
        .get(format!("{base}/v1/replay/{token}"))
        .send()
        .await
        .expect("send replay");
    assert_eq!(response.status(), 200);
    let trace: Value = response.json().await.expect("trace body");
    assert_eq!(trace["decision_id"], decision["decision"]["decision_id"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_of_unknown_decisions_is_404() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base}/v1/replay/no-such-decision"))
        .send()
        .await
        .expect("send");
    assert_eq!(response.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_verify_reports_a_verified_verdict() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let decision = decide(&base, &client).await;
    let decision_id = decision["decision"]["decision_id"].as_str().expect("id");

    let response = client
        .post(format!("{base}/v1/replay/{decision_id}/verify"))
        .send()
        .await
        .expect("send verify");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body");
    assert_eq!(body["verdict"], json!("verified"));
}

#[tokio::test(flavor = "multi_thread")]
async fn feedback_is_accepted_but_never_applied() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();
    let decision = decide(&base, &client).await;
    let decision_id = decision["decision"]["decision_id"].as_str().expect("id");

    let response = client
        .post(format!("{base}/v1/feedback"))
        .json(&json!({
            "decision_id": decision_id,
            "outcome": {"completed": true},
        }))
        .send()
        .await
        .expect("send feedback");
    assert_eq!(response.status(), 202);
    let body: Value = response.json().await.expect("body");
    assert_eq!(body["accepted"], json!(true));
    assert_eq!(body["learning_applied"], json!(false));

    let unknown = client
        .post(format!("{base}/v1/feedback"))
        .json(&json!({
            "decision_id": "no-such-decision",
            "outcome": {"completed": false},
        }))
        .send()
        .await
        .expect("send feedback");
    assert_eq!(unknown.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_and_scenario_listing_respond() {
    let base = spawn_server(demo_engine()).await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{base}/v1/health"))
        .send()
        .await
        .expect("send health");
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.expect("body");
    assert_eq!(body["status"], json!("ok"));

    let scenarios = client
        .get(format!("{base}/v1/scenarios"))
        .send()
        .await
        .expect("send scenarios");
    assert_eq!(scenarios.status(), 200);
    let body: Value = scenarios.json().await.expect("body");
    let listed = body["scenarios"].as_array().expect("array");
    assert_eq!(listed.len(), 2);
}
