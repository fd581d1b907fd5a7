//! tiergate-state — shared state store for Tiergate.
//!
//! Backed by [redb](https://docs.rs/redb), holds the authoritative active
//! serving tier and per-session tier bindings with expiry. The
//! request-routing layer reads and writes session bindings; the
//! capacity-planning control loop writes the active tier and treats this
//! store as the single source of truth other components read.
//!
//! # Architecture
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. The
//! active tier lives under a single well-known key; session bindings are
//! keyed by session id and carry an absolute expiry timestamp (redb has no
//! native TTL, so expired rows read as absent and are swept explicitly).
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and is injected into the planner and API at construction.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
