//! tiergate-capacity — the capacity-planning control loop.
//!
//! Watches request-log volume and transitions the active serving tier in
//! the shared state store. Two independently paced periodic tasks share
//! one threshold:
//!
//! ```text
//! scale-up watch (every T):    sample ──► decide ──► spin up both tiers,
//!                                                    join, record winner,
//!                                                    raise threshold
//! scale-down watch (every 2T): sample + evidence ──► reset tier to large,
//!                                                    reset threshold
//! ```
//!
//! # Decision rules
//!
//! ```text
//! scale-up   iff observed >  threshold.current
//! scale-down iff observed <  threshold.initial
//!            and no recent small-tier evidence
//!            and threshold is elevated
//! ```
//!
//! The asymmetry is deliberate: scale-down requires returning below the
//! *baseline*, not merely below the elevated threshold, which prevents
//! oscillation near the elevated level.

pub mod config;
pub mod decision;
pub mod observer;
pub mod planner;
pub mod threshold;
pub mod transition;

pub use config::CapacityConfig;
pub use decision::{ScaleAction, decide};
pub use observer::LoadObserver;
pub use planner::{CapacityPlanner, CapacityStatus};
pub use threshold::Threshold;
pub use transition::{ProvisioningDelays, TierTransition};
