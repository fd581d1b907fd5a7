//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore` and returns JSON responses.
//! The active tier is consumed as a read-only value; if it cannot be read
//! the router falls back to the small tier rather than failing the call.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use tiergate_state::Tier;

use crate::{ApiState, SESSION_TTL};

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (status, Json(serde_json::json!({ "error": msg })))
}

// ── Health ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let healthy = state.store.health_check();
    Json(HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        store: if healthy { "connected" } else { "disconnected" },
    })
}

// ── Sessions ───────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct InitiateRequest {
    /// Client-supplied session id; generated when absent.
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct InitiateResponse {
    pub session_id: String,
    pub model: String,
    pub status: String,
}

/// POST /api/v1/sessions
///
/// Assigns the session to the currently active tier and persists the
/// binding. The returned session id embeds the tier name.
pub async fn initiate_session(
    State(state): State<ApiState>,
    Json(req): Json<InitiateRequest>,
) -> impl IntoResponse {
    let base_id = req
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let tier = match state.store.active_tier() {
        Ok(Some(tier)) => tier,
        Ok(None) => {
            error!("no active tier recorded; falling back to small tier");
            Tier::Small
        }
        Err(e) => {
            error!(error = %e, "failed to read active tier; falling back to small tier");
            Tier::Small
        }
    };

    let session_id = format!("{base_id}_{tier}");

    if let Err(e) = state.store.set_session_tier(&session_id, tier, SESSION_TTL) {
        error!(error = %e, %session_id, "failed to store session binding");
        return error_response("failed to store session binding", StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    info!(%session_id, %tier, "session initiated");

    Json(InitiateResponse {
        session_id,
        model: tier.to_string(),
        status: "initiated".to_string(),
    })
    .into_response()
}

// ── Completions ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompletionRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct CompletionResponse {
    pub session_id: String,
    pub response: String,
    pub model_used: String,
    pub status: String,
}

/// POST /api/v1/completions
///
/// Resolves the session's tier binding and serves a simulated completion
/// with tier-dependent latency. Unknown or expired sessions are 404.
pub async fn chat_completion(
    State(state): State<ApiState>,
    Json(req): Json<CompletionRequest>,
) -> impl IntoResponse {
    let started = Instant::now();

    let tier = match state.store.session_tier(&req.session_id) {
        Ok(Some(tier)) => tier,
        Ok(None) => {
            return error_response("session has no tier binding", StatusCode::NOT_FOUND)
                .into_response();
        }
        Err(e) => {
            error!(error = %e, session_id = %req.session_id, "failed to resolve session tier");
            return error_response("failed to resolve session tier", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };

    // Simulated inference.
    tokio::time::sleep(state.response_delays.for_tier(tier)).await;
    let response = format!(
        "{tier} response for session {}: {}",
        req.session_id, req.message
    );

    info!(
        session_id = %req.session_id,
        %tier,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "chat completion processed"
    );

    Json(CompletionResponse {
        session_id: req.session_id,
        response,
        model_used: tier.to_string(),
        status: "completed".to_string(),
    })
    .into_response()
}

// ── Capacity ───────────────────────────────────────────────────

/// GET /api/v1/capacity/status
pub async fn capacity_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.planner.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tiergate_capacity::{CapacityConfig, CapacityPlanner};
    use tiergate_state::StateStore;

    use crate::ResponseDelays;

    fn test_state(dir: &std::path::Path) -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        let config = CapacityConfig {
            log_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let planner = Arc::new(CapacityPlanner::new(store.clone(), &config));
        ApiState::new(store, planner).with_response_delays(ResponseDelays {
            large: Duration::ZERO,
            small: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn health_reports_connected_store() {
        let dir = tempfile::tempdir().unwrap();
        let resp = health(State(test_state(dir.path()))).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn initiate_assigns_seeded_large_tier() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = initiate_session(State(state.clone()), Json(InitiateRequest::default()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: InitiateResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.session_id.ends_with("_large-model"));
        assert_eq!(body.model, "large-model");
        assert_eq!(body.status, "initiated");

        // The binding must resolve afterwards.
        assert_eq!(
            state.store.session_tier(&body.session_id).unwrap(),
            Some(Tier::Large)
        );
    }

    #[tokio::test]
    async fn initiate_keeps_client_session_id_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.store.set_active_tier(Tier::Small).unwrap();

        let req = InitiateRequest {
            session_id: Some("client-123".to_string()),
        };
        let resp = initiate_session(State(state), Json(req)).await.into_response();

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: InitiateResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.session_id, "client-123_small-model");
    }

    #[tokio::test]
    async fn completion_uses_bound_tier() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state
            .store
            .set_session_tier("s1_small-model", Tier::Small, SESSION_TTL)
            .unwrap();

        let req = CompletionRequest {
            session_id: "s1_small-model".to_string(),
            message: "hello".to_string(),
        };
        let resp = chat_completion(State(state), Json(req)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: CompletionResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.model_used, "small-model");
        assert_eq!(body.status, "completed");
        assert!(body.response.contains("hello"));
    }

    #[tokio::test]
    async fn completion_for_unknown_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let req = CompletionRequest {
            session_id: "ghost".to_string(),
            message: "hello".to_string(),
        };
        let resp = chat_completion(State(state), Json(req)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn completion_for_expired_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state
            .store
            .set_session_tier("old_large-model", Tier::Large, Duration::ZERO)
            .unwrap();

        let req = CompletionRequest {
            session_id: "old_large-model".to_string(),
            message: "hi".to_string(),
        };
        let resp = chat_completion(State(state), Json(req)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn capacity_status_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = capacity_status(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: tiergate_capacity::CapacityStatus = serde_json::from_slice(&bytes).unwrap();
        assert!(!status.running);
        assert_eq!(status.current_threshold, status.initial_threshold);
    }
}
