//! StateStore — redb-backed persistence for the active tier and sessions.
//!
//! The active tier is a singleton key in the control table; session
//! bindings carry their own expiry and read as absent once past it. On
//! first open the store is seeded with the large tier as the conservative
//! default, so routing always has a tier to read.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::tables::{ACTIVE_TIER_KEY, CONTROL, SESSIONS};
use crate::types::{SessionBinding, Tier};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        store.seed_default_tier()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        store.seed_default_tier()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(CONTROL).map_err(map_err!(Table))?;
        txn.open_table(SESSIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Seed the active tier with the conservative default if unset.
    fn seed_default_tier(&self) -> StateResult<()> {
        match self.active_tier()? {
            Some(tier) => {
                debug!(%tier, "active tier already recorded");
            }
            None => {
                self.set_active_tier(Tier::Large)?;
                info!(tier = %Tier::Large, "seeded store with default active tier");
            }
        }
        Ok(())
    }

    // ── Active tier ────────────────────────────────────────────────

    /// Get the currently active tier, if one is recorded.
    pub fn active_tier(&self) -> StateResult<Option<Tier>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTROL).map_err(map_err!(Table))?;
        match table.get(ACTIVE_TIER_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let tier: Tier =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(tier))
            }
            None => Ok(None),
        }
    }

    /// Record the active tier. Durable and unexpiring.
    pub fn set_active_tier(&self, tier: Tier) -> StateResult<()> {
        let value = serde_json::to_vec(&tier).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CONTROL).map_err(map_err!(Table))?;
            table
                .insert(ACTIVE_TIER_KEY, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%tier, "active tier stored");
        Ok(())
    }

    // ── Session bindings ───────────────────────────────────────────

    /// Bind a session to a tier for `ttl` from now.
    pub fn set_session_tier(&self, session_id: &str, tier: Tier, ttl: Duration) -> StateResult<()> {
        let binding = SessionBinding {
            tier,
            expires_at: epoch_secs() + ttl.as_secs(),
        };
        let value = serde_json::to_vec(&binding).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SESSIONS).map_err(map_err!(Table))?;
            table
                .insert(session_id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%session_id, %tier, ttl_secs = ttl.as_secs(), "session binding stored");
        Ok(())
    }

    /// Resolve a session's tier. Expired bindings read as absent.
    pub fn session_tier(&self, session_id: &str) -> StateResult<Option<Tier>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SESSIONS).map_err(map_err!(Table))?;
        match table.get(session_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let binding: SessionBinding =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                if binding.expires_at <= epoch_secs() {
                    Ok(None)
                } else {
                    Ok(Some(binding.tier))
                }
            }
            None => Ok(None),
        }
    }

    /// Delete all expired session bindings. Returns the number removed.
    pub fn purge_expired_sessions(&self) -> StateResult<u32> {
        let now = epoch_secs();
        // Collect expired keys in a read transaction first.
        let keys: Vec<String> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(SESSIONS).map_err(map_err!(Table))?;
            table
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| {
                    let (key, value) = entry.ok()?;
                    let binding: SessionBinding = serde_json::from_slice(value.value()).ok()?;
                    (binding.expires_at <= now).then(|| key.value().to_string())
                })
                .collect()
        };
        // Delete in a write transaction.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = keys.len() as u32;
        {
            let mut table = txn.open_table(SESSIONS).map_err(map_err!(Table))?;
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if count > 0 {
            debug!(count, "expired session bindings purged");
        }
        Ok(count)
    }

    // ── Health ─────────────────────────────────────────────────────

    /// Whether the store can serve reads right now.
    pub fn health_check(&self) -> bool {
        match self.db.begin_read() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "state store health check failed");
                false
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
