// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket subscription endpoint.
//!
//! `GET /ws?topics=request:{id},inbox:{user},queue:pending&token=...`
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "request_claimed", "event_id": "...", "request_id": "...", "occurred_at": "...", "expert_id": "bob"}
//! {"type": "resync", "topic": "request:...", "missed": 12}
//! ```
//!
//! A `resync` frame means events were dropped; the client re-reads current
//! state through the REST API. Client frames are ignored except for close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use numis_bus::{Delivery, Subscription, Topic};
use serde::Deserialize;

use crate::auth::bearer_token;
use crate::handlers::ErrorResponse;
use crate::server::GatewayState;

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Comma-separated topic names.
    pub topics: String,
    /// Bearer token for clients that cannot set headers.
    #[serde(default)]
    pub token: Option<String>,
}

/// Parse a comma-separated topic list. Empty lists are rejected.
pub fn parse_topics(raw: &str) -> Result<Vec<Topic>, String> {
    let topics = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<Topic>)
        .collect::<Result<Vec<_>, _>>()?;
    if topics.is_empty() {
        return Err("at least one topic is required".to_string());
    }
    Ok(topics)
}

/// Render a delivery as a text frame.
pub fn frame_for(delivery: &Delivery) -> Result<String, serde_json::Error> {
    match delivery {
        Delivery::Event(event) => serde_json::to_string(event.as_ref()),
        Delivery::Resync { topic, missed } => serde_json::to_string(&serde_json::json!({
            "type": "resync",
            "topic": topic.to_string(),
            "missed": missed,
        })),
    }
}

/// WebSocket upgrade handler.
///
/// Subscribes before upgrading so no event published after the handshake is
/// missed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Response {
    let presented = bearer_token(&headers).or(params.token.as_deref());
    if !state.auth.authorize(presented) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let topics = match parse_topics(&params.topics) {
        Ok(topics) => topics,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    code: "bad_request".to_string(),
                    error,
                }),
            )
                .into_response();
        }
    };
    let subscription = state.service.subscribe(topics);
    ws.on_upgrade(move |socket| handle_socket(socket, subscription))
}

async fn handle_socket(socket: WebSocket, mut subscription: Subscription) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let topics: Vec<String> = subscription.topics().map(ToString::to_string).collect();
    tracing::debug!(?topics, "websocket subscriber connected");

    loop {
        tokio::select! {
            delivery = subscription.recv() => {
                let Some(delivery) = delivery else { break };
                let frame = match frame_for(&delivery) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("failed to encode websocket frame: {e}");
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(?topics, "websocket subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use numis_bus::{BusEvent, EventKind};
    use numis_core::types::{RequestId, UserId};
    use std::sync::Arc;

    #[test]
    fn parses_topic_lists() {
        let topics = parse_topics("request:r-1, inbox:alice,queue:pending").unwrap();
        assert_eq!(
            topics,
            vec![
                Topic::Request(RequestId::from("r-1")),
                Topic::Inbox(UserId::from("alice")),
                Topic::PendingQueue,
            ]
        );
        assert!(parse_topics("").is_err());
        assert!(parse_topics("request:r-1,bogus").is_err());
    }

    #[test]
    fn resync_frame_names_topic() {
        let frame = frame_for(&Delivery::Resync {
            topic: Topic::PendingQueue,
            missed: 4,
        })
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "resync");
        assert_eq!(json["topic"], "queue:pending");
        assert_eq!(json["missed"], 4);
    }

    #[test]
    fn event_frame_is_the_bus_event() {
        let event = BusEvent::new(
            RequestId::from("r-1"),
            EventKind::RequestClaimed {
                expert_id: UserId::from("bob"),
            },
        );
        let frame = frame_for(&Delivery::Event(Arc::new(event.clone()))).unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "request_claimed");
        assert_eq!(json["event_id"], event.event_id.to_string());
    }
}
