//! redb table definitions for the Tiergate state store.
//!
//! Both tables use `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). The control table holds singleton keys; sessions are keyed by
//! session id.

use redb::TableDefinition;

/// Singleton control values. The active tier lives under [`ACTIVE_TIER_KEY`].
pub const CONTROL: TableDefinition<&str, &[u8]> = TableDefinition::new("control");

/// Session tier bindings keyed by session id.
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Well-known key for the currently active tier.
pub const ACTIVE_TIER_KEY: &str = "active_tier";
