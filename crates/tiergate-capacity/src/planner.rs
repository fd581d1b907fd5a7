//! Capacity planner — the control-loop scheduler.
//!
//! Owns two periodic watch tasks sharing one threshold:
//!
//! - the **scale-up watch** runs every check interval and triggers the
//!   transition executor when observed load exceeds the current threshold;
//! - the **scale-down watch** runs at twice that period, additionally
//!   consults the small-tier evidence scan, and piggybacks the expired
//!   session sweep.
//!
//! `start()` is idempotent; `stop()` flips a cooperative watch flag that
//! each loop observes at the top of its iteration — in-flight transitions
//! are never cancelled, only further iterations stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tiergate_state::StateStore;

use crate::config::CapacityConfig;
use crate::decision::{ScaleAction, decide};
use crate::observer::LoadObserver;
use crate::threshold::Threshold;
use crate::transition::TierTransition;

/// Point-in-time snapshot of the planner, re-sampled on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityStatus {
    pub running: bool,
    pub current_threshold: u64,
    pub initial_threshold: u64,
    pub log_directory_size: u64,
    pub has_small_model_usage: bool,
}

/// The running pair of watch tasks and their shutdown signal.
struct WatchTasks {
    shutdown_tx: watch::Sender<bool>,
    scale_up: JoinHandle<()>,
    scale_down: JoinHandle<()>,
}

pub struct CapacityPlanner {
    store: StateStore,
    observer: LoadObserver,
    executor: Arc<TierTransition>,
    threshold: Arc<RwLock<Threshold>>,
    running: AtomicBool,
    check_interval: Duration,
    tasks: Mutex<Option<WatchTasks>>,
}

impl CapacityPlanner {
    pub fn new(store: StateStore, config: &CapacityConfig) -> Self {
        let observer = LoadObserver::new(config.log_dir.clone(), config.window());
        let executor = Arc::new(TierTransition::new(store.clone(), config.delays()));
        Self {
            store,
            observer,
            executor,
            threshold: Arc::new(RwLock::new(Threshold::new(config.initial_threshold))),
            running: AtomicBool::new(false),
            check_interval: config.check_interval(),
            tasks: Mutex::new(None),
        }
    }

    /// Start both watch tasks. A second call while running is a no-op.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            warn!("capacity planner is already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scale_up = tokio::spawn(scale_up_watch(
            self.observer.clone(),
            self.executor.clone(),
            self.threshold.clone(),
            self.check_interval,
            shutdown_rx.clone(),
        ));
        let scale_down = tokio::spawn(scale_down_watch(
            self.observer.clone(),
            self.executor.clone(),
            self.threshold.clone(),
            self.store.clone(),
            self.check_interval * 2,
            shutdown_rx,
        ));

        *tasks = Some(WatchTasks {
            shutdown_tx,
            scale_up,
            scale_down,
        });
        self.running.store(true, Ordering::SeqCst);
        info!(
            check_interval_ms = self.check_interval.as_millis() as u64,
            "capacity planner started"
        );
    }

    /// Stop scheduling further iterations. In-flight transitions finish on
    /// their own; they are not cancelled or awaited here.
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        match tasks.take() {
            Some(t) => {
                let _ = t.shutdown_tx.send(true);
                self.running.store(false, Ordering::SeqCst);
                info!("capacity planner stopped");
            }
            None => debug!("capacity planner stop requested while not running"),
        }
    }

    /// Fresh status snapshot. Re-samples the log directory; nothing is
    /// cached.
    pub async fn status(&self) -> CapacityStatus {
        let threshold = *self.threshold.read().await;
        CapacityStatus {
            running: self.running.load(Ordering::SeqCst),
            current_threshold: threshold.current(),
            initial_threshold: threshold.initial(),
            log_directory_size: self.observer.sample(),
            has_small_model_usage: self.observer.small_tier_evidence(),
        }
    }
}

async fn scale_up_watch(
    observer: LoadObserver,
    executor: Arc<TierTransition>,
    threshold: Arc<RwLock<Threshold>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_ms = interval.as_millis() as u64, "scale-up watch started");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let observed = observer.sample();
                let current = *threshold.read().await;
                debug!(observed, threshold = current.current(), "scale-up watch tick");

                // Evidence only gates scale-down; this watch acts on
                // ScaleUp alone.
                if decide(observed, &current, false) == ScaleAction::ScaleUp {
                    warn!(
                        observed,
                        threshold = current.current(),
                        "observed load exceeds threshold"
                    );
                    if !executor.scale_up(&threshold).await {
                        error!("scale-up did not complete; retrying on a later tick");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("scale-up watch shutting down");
                break;
            }
        }
    }
}

async fn scale_down_watch(
    observer: LoadObserver,
    executor: Arc<TierTransition>,
    threshold: Arc<RwLock<Threshold>>,
    store: StateStore,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_ms = interval.as_millis() as u64, "scale-down watch started");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let observed = observer.sample();
                let evidence = observer.small_tier_evidence();
                let current = *threshold.read().await;
                debug!(observed, evidence, threshold = current.current(), "scale-down watch tick");

                if decide(observed, &current, evidence) == ScaleAction::ScaleDown {
                    info!(observed, "conditions met for scale-down");
                    if !executor.scale_down(&threshold).await {
                        error!("scale-down did not complete; retrying on a later tick");
                    }
                }

                // Housekeeping rides the slower loop.
                if let Err(e) = store.purge_expired_sessions() {
                    warn!(error = %e, "expired session purge failed");
                }
            }
            _ = shutdown.changed() => {
                info!("scale-down watch shutting down");
                break;
            }
        }
    }
}
