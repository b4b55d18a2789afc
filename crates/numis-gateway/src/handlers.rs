// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Every mutating route names the acting user in its JSON body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use numis_core::types::{AuthRequest, HealthStatus, Message, RequestId, RequestStatus, UserId};
use numis_core::NumisError;
use numis_session::{ClaimOutcome, EndedSession, ExternalMessage};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Request body for POST /v1/requests.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub submitter_id: UserId,
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for POST /v1/requests/{id}/claim.
#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    pub expert_id: UserId,
}

/// Request body for reject and end: the acting participant.
#[derive(Debug, Deserialize)]
pub struct ActorBody {
    pub user_id: UserId,
}

/// Request body for POST /v1/sessions/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct AppendBody {
    pub sender_id: UserId,
    pub body: String,
    /// Optional idempotency key; retries with the same key store one message.
    #[serde(default)]
    pub client_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub requests: Vec<AuthRequest>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind, e.g. `session_not_active`.
    pub code: String,
    pub error: String,
}

/// A handler failure rendered as a status code and [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Domain(NumisError),
    BadRequest(String),
}

impl From<NumisError> for ApiError {
    fn from(e: NumisError) -> Self {
        ApiError::Domain(e)
    }
}

/// Status code and error code for a domain error.
pub fn classify(error: &NumisError) -> (StatusCode, &'static str) {
    match error {
        NumisError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        NumisError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
        NumisError::SessionNotActive { .. } => (StatusCode::CONFLICT, "session_not_active"),
        NumisError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        NumisError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        NumisError::PaymentDeclined { .. } => (StatusCode::PAYMENT_REQUIRED, "payment_declined"),
        NumisError::Payment(_) => (StatusCode::BAD_GATEWAY, "payment_failed"),
        NumisError::UpstreamUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable")
        }
        NumisError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        NumisError::ArchivalFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "archival_failure"),
        NumisError::Config(_) | NumisError::Storage { .. } | NumisError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::Domain(e) => {
                let (status, code) = classify(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                (status, code, e.to_string())
            }
        };
        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                error: message,
            }),
        )
            .into_response()
    }
}

/// POST /v1/requests
pub async fn create_request(
    State(state): State<GatewayState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<AuthRequest>), ApiError> {
    if body.images.is_empty() {
        return Err(ApiError::BadRequest("at least one image is required".into()));
    }
    let request = state
        .service
        .create_request(body.submitter_id, body.images, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /v1/requests/pending
pub async fn list_pending(
    State(state): State<GatewayState>,
) -> Result<Json<RequestListResponse>, ApiError> {
    let requests = state.service.list_pending_for_experts().await?;
    Ok(Json(RequestListResponse { requests }))
}

/// GET /v1/requests/{id}
pub async fn get_request(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<AuthRequest>, ApiError> {
    Ok(Json(state.service.get_request(&RequestId::from(id.as_str())).await?))
}

/// POST /v1/requests/{id}/claim
///
/// 200 for the winner; 409 with the outcome for everyone else.
pub async fn claim(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<ClaimBody>,
) -> Result<Response, ApiError> {
    let outcome = state
        .service
        .claim(&RequestId::from(id.as_str()), &body.expert_id)
        .await?;
    let status = match outcome {
        ClaimOutcome::Accepted { .. } => StatusCode::OK,
        ClaimOutcome::AlreadyClaimed | ClaimOutcome::NotPending { .. } => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)).into_response())
}

/// POST /v1/requests/{id}/reject
pub async fn reject(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<AuthRequest>, ApiError> {
    let request = state
        .service
        .reject_request(&RequestId::from(id.as_str()), &body.user_id)
        .await?;
    Ok(Json(request))
}

/// POST /v1/requests/{id}/end
pub async fn end_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<EndedSession>, ApiError> {
    let ended = state
        .service
        .end_session(&RequestId::from(id.as_str()), &body.user_id)
        .await?;
    Ok(Json(ended))
}

/// POST /v1/sessions/{id}/messages
pub async fn append_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<AppendBody>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if body.body.trim().is_empty() {
        return Err(ApiError::BadRequest("message body must not be empty".into()));
    }
    let message = state
        .service
        .append_message(
            &RequestId::from(id.as_str()),
            &body.sender_id,
            &body.body,
            body.client_key.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /v1/sessions/{id}/messages
pub async fn history(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.service.history(&RequestId::from(id.as_str())).await?;
    Ok(Json(HistoryResponse { messages }))
}

/// GET /v1/sessions/{id}/document
///
/// 202 while a completed session is still being archived.
pub async fn get_document(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = RequestId::from(id.as_str());
    if let Some(document) = state.service.get_session_document(&id).await? {
        return Ok(Json(document).into_response());
    }
    let request = state.service.get_request(&id).await?;
    if request.status == RequestStatus::Completed {
        return Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "archival_pending" })),
        )
            .into_response());
    }
    Err(NumisError::not_found("session document", id.as_str()).into())
}

/// POST /v1/ingest/chat
///
/// Entry point for the external chat-delivery service.
pub async fn ingest_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ExternalMessage>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.service.ingest_external(body).await?))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (status_code, status) = match state.service.health().await {
        HealthStatus::Healthy => (StatusCode::OK, "ok".to_string()),
        HealthStatus::Degraded(reason) => (StatusCode::OK, format!("degraded: {reason}")),
        HealthStatus::Unhealthy(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
    };
    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
        }),
    )
        .into_response()
}
