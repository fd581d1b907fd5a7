//! tiergate-api — the request-routing REST API.
//!
//! Routes inference sessions to the currently active serving tier. The
//! active tier is read from the shared state store; this layer never
//! decides tier transitions, it only consumes them.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Service + store health |
//! | POST | `/api/v1/sessions` | Initiate a session, bind it to a tier |
//! | POST | `/api/v1/completions` | Serve a (simulated) chat completion |
//! | GET | `/api/v1/capacity/status` | Capacity planner snapshot |
//!
//! Completion handlers emit `info` events carrying the tier name; the
//! daemon routes this crate's events into the monitored log directory,
//! which is what the capacity loop samples and scans.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};

use tiergate_capacity::CapacityPlanner;
use tiergate_state::{StateStore, Tier};

/// How long a session binding stays valid.
pub const SESSION_TTL: Duration = Duration::from_secs(3600);

/// Simulated inference latency per tier.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDelays {
    pub large: Duration,
    pub small: Duration,
}

impl Default for ResponseDelays {
    fn default() -> Self {
        Self {
            large: Duration::from_secs(2),
            small: Duration::from_secs(1),
        }
    }
}

impl ResponseDelays {
    pub fn for_tier(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Large => self.large,
            Tier::Small => self.small,
        }
    }
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub planner: Arc<CapacityPlanner>,
    pub response_delays: ResponseDelays,
}

impl ApiState {
    pub fn new(store: StateStore, planner: Arc<CapacityPlanner>) -> Self {
        Self {
            store,
            planner,
            response_delays: ResponseDelays::default(),
        }
    }

    /// Override the simulated inference latency (tests use zero).
    pub fn with_response_delays(mut self, delays: ResponseDelays) -> Self {
        self.response_delays = delays;
        self
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/sessions", post(handlers::initiate_session))
        .route("/completions", post(handlers::chat_completion))
        .route("/capacity/status", get(handlers::capacity_status))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health).with_state(state))
}
