use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::ConflictScope;

/// Runtime settings, read from `CAMPUSBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// WAL appends since the last compaction before the compactor rewrites it.
    pub compact_threshold: u64,
    pub sweep_interval: Duration,
    pub metrics_port: Option<u16>,
    pub conflict_scope: ConflictScope,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            compact_threshold: 1000,
            sweep_interval: Duration::from_secs(60),
            metrics_port: None,
            conflict_scope: ConflictScope::Active,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let conflict_scope = match lookup("CAMPUSBOOK_PENDING_BLOCKS").as_deref() {
            Some("false" | "0" | "no") => ConflictScope::ApprovedOnly,
            _ => ConflictScope::Active,
        };

        Self {
            data_dir: lookup("CAMPUSBOOK_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            compact_threshold: parsed("CAMPUSBOOK_COMPACT_THRESHOLD").unwrap_or(defaults.compact_threshold),
            sweep_interval: parsed("CAMPUSBOOK_SWEEP_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .map_or(defaults.sweep_interval, Duration::from_millis),
            metrics_port: lookup("CAMPUSBOOK_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            conflict_scope,
        }
    }

    /// Location of the booking log inside `data_dir`.
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("bookings.wal")
    }
}
