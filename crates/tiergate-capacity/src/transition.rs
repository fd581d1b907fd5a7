//! Tier transition executor.
//!
//! Carries out scale-up and scale-down actions decided by the control
//! loop, including the simulated provisioning latency per tier, and
//! records the resulting tier in the shared state store.
//!
//! Scale-up runs two concurrent sub-transitions (one spin-up per tier)
//! and joins both before returning; the calling loop iteration blocks for
//! the full provisioning time. The sub-transitions never touch the store
//! themselves — they report back to the executor, which applies one
//! deterministic resolution (large tier preferred, small as fallback) and
//! performs a single active-tier write. The threshold only advances after
//! that write is confirmed.

use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use tiergate_state::{StateStore, Tier};

use crate::threshold::Threshold;

/// Simulated provisioning latency per transition kind.
///
/// The large-tier spin-up is much longer than the small-tier one; tests
/// inject near-zero values while keeping that ordering.
#[derive(Debug, Clone, Copy)]
pub struct ProvisioningDelays {
    pub large: Duration,
    pub small: Duration,
    pub scale_down: Duration,
}

impl Default for ProvisioningDelays {
    fn default() -> Self {
        Self {
            large: Duration::from_secs(100),
            small: Duration::from_secs(20),
            scale_down: Duration::from_secs(5),
        }
    }
}

pub struct TierTransition {
    store: StateStore,
    delays: ProvisioningDelays,
}

impl TierTransition {
    pub fn new(store: StateStore, delays: ProvisioningDelays) -> Self {
        Self { store, delays }
    }

    /// One simulated spin-up. Reports the tier it provisioned.
    async fn spin_up(tier: Tier, delay: Duration) -> Tier {
        info!(%tier, delay_ms = delay.as_millis() as u64, "spin-up started (simulated)");
        tokio::time::sleep(delay).await;
        info!(%tier, "spin-up complete");
        tier
    }

    /// Execute a scale-up: spin up both tiers concurrently, join both,
    /// record the winning tier, raise the threshold.
    ///
    /// Returns false if no tier could be recorded; the threshold is left
    /// unmodified in that case and the decision is retried on a later tick.
    pub async fn scale_up(&self, threshold: &RwLock<Threshold>) -> bool {
        let large = tokio::spawn(Self::spin_up(Tier::Large, self.delays.large));
        let small = tokio::spawn(Self::spin_up(Tier::Small, self.delays.small));
        let (large_result, small_result) = tokio::join!(large, small);

        // Resolution: the large tier wins whenever its spin-up finished;
        // the small tier only stands in when the large task died.
        let winner = match (large_result, small_result) {
            (Ok(tier), _) => tier,
            (Err(e), Ok(tier)) => {
                warn!(error = %e, "large-tier spin-up task failed; falling back to small tier");
                tier
            }
            (Err(large_err), Err(small_err)) => {
                error!(%large_err, %small_err, "both spin-up tasks failed");
                return false;
            }
        };

        if let Err(e) = self.store.set_active_tier(winner) {
            error!(error = %e, tier = %winner, "failed to record active tier after scale-up");
            return false;
        }

        if winner == Tier::Large {
            let mut th = threshold.write().await;
            th.raise();
            info!(tier = %winner, threshold = th.current(), "scale-up complete");
        } else {
            info!(tier = %winner, "scale-up complete; threshold unchanged");
        }
        true
    }

    /// Execute a scale-down: one simulated delay, then reset the tier to
    /// large and the threshold to its baseline.
    pub async fn scale_down(&self, threshold: &RwLock<Threshold>) -> bool {
        info!(delay_ms = self.delays.scale_down.as_millis() as u64, "scale-down started (simulated)");
        tokio::time::sleep(self.delays.scale_down).await;

        if let Err(e) = self.store.set_active_tier(Tier::Large) {
            error!(error = %e, "failed to record active tier during scale-down");
            return false;
        }

        let mut th = threshold.write().await;
        th.reset();
        info!(threshold = th.current(), "scale-down complete");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const FAST: ProvisioningDelays = ProvisioningDelays {
        large: Duration::ZERO,
        small: Duration::ZERO,
        scale_down: Duration::ZERO,
    };

    fn test_store() -> StateStore {
        StateStore::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn scale_up_raises_threshold_and_records_large() {
        let store = test_store();
        let executor = TierTransition::new(store.clone(), FAST);
        let threshold = RwLock::new(Threshold::new(102_400));

        assert!(executor.scale_up(&threshold).await);

        let th = threshold.read().await;
        assert_eq!(th.current(), 204_800);
        assert_eq!(store.active_tier().unwrap(), Some(Tier::Large));
    }

    #[tokio::test]
    async fn scale_up_joins_both_spin_ups() {
        // The small spin-up outlasting the large one must still be waited
        // for: the iteration blocks until both sub-transitions complete.
        let delays = ProvisioningDelays {
            large: Duration::from_millis(10),
            small: Duration::from_millis(80),
            scale_down: Duration::ZERO,
        };
        let executor = TierTransition::new(test_store(), delays);
        let threshold = RwLock::new(Threshold::new(100));

        let started = Instant::now();
        assert!(executor.scale_up(&threshold).await);
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn scale_down_resets_threshold_and_tier() {
        let store = test_store();
        store.set_active_tier(Tier::Small).unwrap();
        let executor = TierTransition::new(store.clone(), FAST);
        let threshold = RwLock::new({
            let mut th = Threshold::new(102_400);
            th.raise();
            th
        });

        assert!(executor.scale_down(&threshold).await);

        let th = threshold.read().await;
        assert_eq!(th.current(), 102_400);
        assert_eq!(store.active_tier().unwrap(), Some(Tier::Large));
    }

    #[tokio::test]
    async fn repeated_scale_up_keeps_threshold_invariant() {
        let store = test_store();
        let executor = TierTransition::new(store, FAST);
        let threshold = RwLock::new(Threshold::new(100));

        assert!(executor.scale_up(&threshold).await);
        assert!(executor.scale_up(&threshold).await);

        // current stays in {initial, 2 * initial}.
        assert_eq!(threshold.read().await.current(), 200);
    }
}
