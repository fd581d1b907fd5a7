//! Load observer — windowed byte metric over the request-log directory.
//!
//! Every sample rescans the directory from scratch: a file counts iff its
//! last-modified timestamp falls inside the trailing window, and then its
//! whole size counts. Nothing is decayed or weighted, and no state is kept
//! between samples, so correctness depends only on the files' timestamps.
//!
//! Any I/O failure (including a missing directory) degrades to a zero
//! metric with a warning; observation is never fatal to the control loop.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;
use walkdir::WalkDir;

use tiergate_state::Tier;

#[derive(Debug, Clone)]
pub struct LoadObserver {
    log_dir: PathBuf,
    window: Duration,
}

impl LoadObserver {
    pub fn new(log_dir: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            log_dir: log_dir.into(),
            window,
        }
    }

    /// Total bytes across files modified within the window. Pure read.
    pub fn sample(&self) -> u64 {
        match self.windowed_bytes() {
            Ok(total) => total,
            Err(e) => {
                warn!(dir = ?self.log_dir, error = %e, "failed to sample log directory");
                0
            }
        }
    }

    /// Whether any `.log` file modified within the window mentions the
    /// small tier. Heuristic auxiliary evidence, not usage telemetry.
    pub fn small_tier_evidence(&self) -> bool {
        match self.scan_for_marker(Tier::Small.as_str()) {
            Ok(found) => found,
            Err(e) => {
                warn!(dir = ?self.log_dir, error = %e, "failed to scan logs for small-tier marker");
                false
            }
        }
    }

    fn window_start(&self) -> SystemTime {
        SystemTime::now()
            .checked_sub(self.window)
            .unwrap_or(UNIX_EPOCH)
    }

    fn windowed_bytes(&self) -> io::Result<u64> {
        let window_start = self.window_start();
        let mut total = 0u64;
        for entry in WalkDir::new(&self.log_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            let meta = entry.metadata().map_err(io::Error::from)?;
            if !meta.is_file() {
                continue;
            }
            if meta.modified()? >= window_start {
                total += meta.len();
            }
        }
        Ok(total)
    }

    fn scan_for_marker(&self, marker: &str) -> io::Result<bool> {
        let window_start = self.window_start();
        let needle = marker.to_ascii_lowercase();
        for entry in WalkDir::new(&self.log_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.path().extension().is_none_or(|ext| ext != "log") {
                continue;
            }
            let meta = entry.metadata().map_err(io::Error::from)?;
            if !meta.is_file() || meta.modified()? < window_start {
                continue;
            }
            let content = std::fs::read_to_string(entry.path())?;
            if content.to_lowercase().contains(&needle) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const WIDE: Duration = Duration::from_secs(60);

    #[test]
    fn sums_files_modified_within_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("b.log"), vec![0u8; 500]).unwrap();

        let observer = LoadObserver::new(dir.path(), WIDE);
        assert_eq!(observer.sample(), 1500);
    }

    #[test]
    fn ignores_files_outside_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.log"), vec![0u8; 1000]).unwrap();

        // Let the file age past a one-second window.
        std::thread::sleep(Duration::from_millis(1200));
        fs::write(dir.path().join("fresh.log"), vec![0u8; 300]).unwrap();

        let observer = LoadObserver::new(dir.path(), Duration::from_secs(1));
        assert_eq!(observer.sample(), 300);
    }

    #[test]
    fn ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.log"), vec![0u8; 999]).unwrap();
        fs::write(dir.path().join("top.log"), vec![0u8; 100]).unwrap();

        let observer = LoadObserver::new(dir.path(), WIDE);
        assert_eq!(observer.sample(), 100);
    }

    #[test]
    fn missing_directory_reads_as_zero() {
        let observer = LoadObserver::new("/nonexistent/tiergate-test", WIDE);
        assert_eq!(observer.sample(), 0);
        assert!(!observer.small_tier_evidence());
    }

    #[test]
    fn empty_directory_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let observer = LoadObserver::new(dir.path(), WIDE);
        assert_eq!(observer.sample(), 0);
    }

    #[test]
    fn finds_marker_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("requests.log"),
            "completion served by SMALL-MODEL for session x\n",
        )
        .unwrap();

        let observer = LoadObserver::new(dir.path(), WIDE);
        assert!(observer.small_tier_evidence());
    }

    #[test]
    fn no_marker_means_no_evidence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("requests.log"),
            "completion served by large-model\n",
        )
        .unwrap();

        let observer = LoadObserver::new(dir.path(), WIDE);
        assert!(!observer.small_tier_evidence());
    }

    #[test]
    fn marker_in_non_log_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "small-model").unwrap();

        let observer = LoadObserver::new(dir.path(), WIDE);
        assert!(!observer.small_tier_evidence());
    }

    #[test]
    fn marker_outside_window_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requests.log"), "small-model was used\n").unwrap();

        std::thread::sleep(Duration::from_millis(1200));

        let observer = LoadObserver::new(dir.path(), Duration::from_secs(1));
        assert!(!observer.small_tier_evidence());
    }
}
