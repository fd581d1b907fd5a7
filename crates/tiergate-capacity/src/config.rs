//! Capacity-planner configuration.
//!
//! Loadable from a toml file; all fields have defaults so partial files
//! work. Durations are human-readable strings (`"10s"`, `"500ms"`, `"2m"`)
//! parsed at use-sites with conservative fallbacks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transition::ProvisioningDelays;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Directory of request-log files the observer watches.
    pub log_dir: PathBuf,
    /// Scale-up watch period. The scale-down watch runs at twice this.
    pub check_interval: String,
    /// Trailing window over which load is aggregated for one decision.
    pub window: String,
    /// Baseline threshold in bytes.
    pub initial_threshold: u64,
    /// Simulated provisioning delay for the large tier.
    pub large_spin_up: String,
    /// Simulated provisioning delay for the small tier.
    pub small_spin_up: String,
    /// Simulated delay for scaling back down.
    pub scale_down_delay: String,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(".logs"),
            check_interval: "10s".to_string(),
            window: "5s".to_string(),
            initial_threshold: 256 * 1024,
            large_spin_up: "100s".to_string(),
            small_spin_up: "20s".to_string(),
            scale_down_delay: "5s".to_string(),
        }
    }
}

impl CapacityConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CapacityConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scale-up watch period.
    pub fn check_interval(&self) -> Duration {
        parse_duration(&self.check_interval).unwrap_or(Duration::from_secs(10))
    }

    /// Observation window.
    pub fn window(&self) -> Duration {
        parse_duration(&self.window).unwrap_or(Duration::from_secs(5))
    }

    /// Simulated provisioning delays for the transition executor.
    pub fn delays(&self) -> ProvisioningDelays {
        ProvisioningDelays {
            large: parse_duration(&self.large_spin_up).unwrap_or(Duration::from_secs(100)),
            small: parse_duration(&self.small_spin_up).unwrap_or(Duration::from_secs(20)),
            scale_down: parse_duration(&self.scale_down_delay).unwrap_or(Duration::from_secs(5)),
        }
    }
}

/// Parse a duration string like "10s", "500ms", "2m", or a plain number
/// of seconds.
pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
