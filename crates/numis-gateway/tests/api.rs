// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST surface tests against a fully wired service.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use numis_gateway::{router, GatewayState};
use numis_test_utils::TestHarness;
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn app(harness: &TestHarness) -> axum::Router {
    router(GatewayState::new(
        harness.service.clone(),
        Some(TOKEN.to_string()),
    ))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness);
    let request = Request::builder()
        .uri("/v1/requests/pending")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gateway_without_token_fails_closed() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = router(GatewayState::new(harness.service.clone(), None));
    let (status, _) = send(&app, get("/v1/requests/pending")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn claim_race_over_http() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness);

    let (status, created) = send(
        &app,
        post(
            "/v1/requests",
            json!({"submitter_id": "alice", "images": ["a.jpg"], "description": "1909-S VDB"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, pending) = send(&app, get("/v1/requests/pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["requests"].as_array().unwrap().len(), 1);

    let claim_uri = format!("/v1/requests/{id}/claim");
    let (status, won) = send(&app, post(&claim_uri, json!({"expert_id": "bob"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(won["outcome"], "accepted");
    assert_eq!(won["request"]["assigned_expert_id"], "bob");

    let (status, lost) = send(&app, post(&claim_uri, json!({"expert_id": "carol"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(lost["outcome"], "already_claimed");
}

#[tokio::test]
async fn session_messages_end_and_document() {
    let harness = TestHarness::builder()
        .with_profile("bob", "Bob B.")
        .build()
        .await
        .unwrap();
    let app = app(&harness);
    let session = harness.open_session("alice", "bob").await.unwrap();
    let id = session.id.as_str();

    let (status, _) = send(
        &app,
        post(
            &format!("/v1/sessions/{id}/messages"),
            json!({"sender_id": "alice", "body": "mint mark?", "client_key": "c-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        post(
            "/v1/ingest/chat",
            json!({
                "session_id": id,
                "origin_id": "wa-77",
                "sender_id": "bob",
                "body": "S, San Francisco",
                "sent_at": "2030-01-01T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, history) = send(&app, get(&format!("/v1/sessions/{id}/messages"))).await;
    assert_eq!(status, StatusCode::OK);
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["id"], format!("ext:{id}:wa-77"));
    assert_eq!(messages[1]["source_channel"], "external");

    let (status, outsider) = send(
        &app,
        post(&format!("/v1/requests/{id}/end"), json!({"user_id": "mallory"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(outsider["code"], "forbidden");

    let (status, ended) = send(
        &app,
        post(&format!("/v1/requests/{id}/end"), json!({"user_id": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["request"]["status"], "completed");

    let (status, document) = send(&app, get(&format!("/v1/sessions/{id}/document"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["transcript"].as_array().unwrap().len(), 2);

    let (status, late) = send(
        &app,
        post(
            &format!("/v1/sessions/{id}/messages"),
            json!({"sender_id": "alice", "body": "thanks!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(late["code"], "session_not_active");
}

#[tokio::test]
async fn unknown_request_is_404() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness);
    let (status, body) = send(&app, get("/v1/requests/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn declined_payment_is_402() {
    let harness = TestHarness::builder()
        .with_request_price(500)
        .with_payment_outcomes(vec![numis_core::types::DebitOutcome::InsufficientFunds])
        .build()
        .await
        .unwrap();
    let app = app(&harness);
    let (status, body) = send(
        &app,
        post("/v1/requests", json!({"submitter_id": "alice", "images": ["a.jpg"]})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "payment_declined");
}

#[tokio::test]
async fn empty_image_list_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness);
    let (status, _) = send(
        &app,
        post("/v1/requests", json!({"submitter_id": "alice", "images": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
