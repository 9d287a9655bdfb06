// crates/ade-server/src/server.rs
// ============================================================================
// Module: ADE HTTP Server
// Description: Axum router and handlers for the v1 decision surface.
// Purpose: Map the engine's operations onto HTTP with the wire error
// contract.
// Dependencies: ade-core, axum, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Routes: `POST /v1/decide`, `GET /v1/replay/{id}` (decision id or
//! `rpl_` token), `POST /v1/replay/{id}/verify`, `POST /v1/feedback`,
//! `GET /v1/health`, and `GET /v1/scenarios`. Policy-concealing failures
//! never surface as HTTP errors; callers receive fallback-synthesized
//! responses with the reason code under `execution.fallback_reason_code`.
//! Replay reads are strictly read-only and stamped `X-Replay-Only: true`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use ade_core::DecisionId;
use ade_core::DecisionRequest;
use ade_core::EngineError;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::HeaderName;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::engine::EngineHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response header marking replay reads as read-only.
pub const REPLAY_ONLY_HEADER: &str = "x-replay-only";
/// Prefix distinguishing replay tokens from decision identifiers.
const REPLAY_TOKEN_PREFIX: &str = "rpl_";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Wire error envelope for terminal failures.
///
/// # Invariants
/// - `code` values match the engine error contract.
#[derive(Debug, Error, Serialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// HTTP status for the error.
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    /// Builds a not-found error for replay surfaces.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: message.into(),
            details: None,
            status: StatusCode::NOT_FOUND,
        }
    }

    /// Builds an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::InvalidRequest { .. } | EngineError::InvalidActionType { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::InvalidScenario { .. } | EngineError::UnknownDecision { .. } => {
                StatusCode::NOT_FOUND
            }
            EngineError::NoEligibleActions { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let details = match &error {
            EngineError::NoEligibleActions {
                details, ..
            } => Some(details.clone()),
            _ => None,
        };
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "details": self.details,
            }
        });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Feedback acknowledgement body.
///
/// # Invariants
/// - `learning_applied` is always false in V1; feedback never mutates
///   memory or influences future decisions.
#[derive(Debug, Serialize)]
struct FeedbackAck {
    /// Whether the feedback was accepted for storage.
    accepted: bool,
    /// Always false in V1.
    learning_applied: bool,
    /// Echoed decision identifier.
    decision_id: String,
}

/// Feedback request body.
#[derive(Debug, Deserialize)]
struct FeedbackBody {
    /// Decision the feedback refers to.
    decision_id: String,
    /// Outcome payload (must carry `completed`).
    #[allow(dead_code, reason = "Accepted and acknowledged but not applied in V1.")]
    outcome: Value,
    /// Optional client timestamp.
    #[allow(dead_code, reason = "Accepted and acknowledged but not applied in V1.")]
    #[serde(default)]
    timestamp: Option<String>,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the v1 router over shared engine state.
#[must_use]
pub fn router(engine: Arc<EngineHandle>) -> Router {
    Router::new()
        .route("/v1/decide", post(handle_decide))
        .route("/v1/replay/{id}", get(handle_replay))
        .route("/v1/replay/{id}/verify", post(handle_replay_verify))
        .route("/v1/feedback", post(handle_feedback))
        .route("/v1/health", get(handle_health))
        .route("/v1/scenarios", get(handle_scenarios))
        .with_state(engine)
}

/// Serves the router on the provided address until the task is aborted.
///
/// # Errors
///
/// Returns [`ApiError::internal`] when binding or serving fails.
pub async fn serve(engine: Arc<EngineHandle>, addr: SocketAddr) -> Result<(), ApiError> {
    let app = router(engine);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::internal(format!("bind failed: {err}")))?;
    info!(%addr, "ade server listening");
    axum::serve(listener, app)
        .await
        .map_err(|err| ApiError::internal(format!("server failed: {err}")))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `POST /v1/decide`.
async fn handle_decide(
    State(engine): State<Arc<EngineHandle>>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<ade_core::DecisionResponse>, ApiError> {
    let response = engine.decide(request).await?;
    Ok(Json(response))
}

/// `GET /v1/replay/{id}` — frozen trace by decision id or replay token.
async fn handle_replay(
    State(engine): State<Arc<EngineHandle>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let trace = if id.starts_with(REPLAY_TOKEN_PREFIX) {
        engine.audit_store.retrieve_by_token(&id).await
    } else {
        engine.audit_store.retrieve(&DecisionId::new(id.clone())).await
    }
    .map_err(|err| ApiError::internal(err.to_string()))?;

    let Some(trace) = trace else {
        return Err(ApiError::not_found(format!("no trace for {id}")));
    };
    let body = serde_json::to_value(&trace)
        .map_err(|err| ApiError::internal(format!("stored trace invalid: {err}")))?;
    let mut response = (StatusCode::OK, Json(body)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(REPLAY_ONLY_HEADER),
        HeaderValue::from_static("true"),
    );
    Ok(response)
}

/// `POST /v1/replay/{id}/verify` — determinism verification.
async fn handle_replay_verify(
    State(engine): State<Arc<EngineHandle>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let decision_id = if let Some((decoded, _)) = ade_core::runtime::stages::decode_replay_token(&id)
    {
        DecisionId::new(decoded)
    } else {
        DecisionId::new(id)
    };
    let comparison = engine.verify_replay(&decision_id).await?;
    let body = serde_json::to_value(&comparison)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(body))
}

/// `POST /v1/feedback` — acknowledged, never applied in V1.
async fn handle_feedback(
    State(engine): State<Arc<EngineHandle>>,
    Json(body): Json<FeedbackBody>,
) -> Result<Response, ApiError> {
    let decision_id = DecisionId::new(body.decision_id.clone());
    let exists = engine
        .audit_store
        .exists(&decision_id)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    if !exists {
        return Err(ApiError::not_found(format!("no decision {}", body.decision_id)));
    }
    let ack = FeedbackAck {
        accepted: true,
        learning_applied: false,
        decision_id: body.decision_id,
    };
    Ok((StatusCode::ACCEPTED, Json(ack)).into_response())
}

/// `GET /v1/health` — static component statuses.
async fn handle_health(State(engine): State<Arc<EngineHandle>>) -> Json<Value> {
    let scenario_count = engine.registry.list().map(|entries| entries.len()).unwrap_or(0);
    Json(json!({
        "status": "ok",
        "components": {
            "pipeline": "ok",
            "audit_store": "ok",
            "memory_store": "ok",
            "scenario_registry": {"status": "ok", "scenarios": scenario_count},
        },
        "engine_version": ade_core::runtime::ENGINE_VERSION,
    }))
}

/// `GET /v1/scenarios` — registry listing.
async fn handle_scenarios(
    State(engine): State<Arc<EngineHandle>>,
) -> Result<Json<Value>, ApiError> {
    let entries = engine
        .registry
        .list()
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(json!({"scenarios": entries})))
}
