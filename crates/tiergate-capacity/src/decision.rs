//! Scaling decision engine.
//!
//! A pure, total function over well-typed inputs; all the state it needs
//! arrives as arguments, so it is trivially unit-testable and has no
//! failure modes.

use crate::threshold::Threshold;

/// What the control loop should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    ScaleUp,
    ScaleDown,
    Hold,
}

/// Map an observed windowed byte count to a scaling action.
///
/// Scale-up triggers on a single sample strictly above the current
/// threshold. Scale-down requires all three of: load strictly below the
/// *baseline*, no recent small-tier evidence, and an elevated threshold to
/// come down from.
pub fn decide(observed: u64, threshold: &Threshold, small_tier_evidence: bool) -> ScaleAction {
    if observed > threshold.current() {
        return ScaleAction::ScaleUp;
    }
    if observed < threshold.initial() && !small_tier_evidence && threshold.is_elevated() {
        return ScaleAction::ScaleDown;
    }
    ScaleAction::Hold
}
