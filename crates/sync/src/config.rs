//! Engine configuration loaded from environment variables.

use std::time::Duration;

use chrono::Duration as ChronoDuration;

/// Configuration for a [`SyncService`](crate::SyncService) instance.
///
/// All fields have defaults suitable for production use; override via
/// environment variables or construct the struct directly in tests.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Advisory lock TTL in seconds (default: `30`).
    pub lock_ttl_secs: u64,
    /// Conflict heuristic window in seconds (default: `300`).
    pub conflict_window_secs: i64,
    /// Bounded history capacity (default: `100`).
    pub history_limit: usize,
    /// Default dimension tolerance percent (default: `5.0`).
    pub default_tolerance_percent: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 30,
            conflict_window_secs: 300,
            history_limit: 100,
            default_tolerance_percent: 5.0,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `SYNC_LOCK_TTL_SECS`         | `30`    |
    /// | `SYNC_CONFLICT_WINDOW_SECS`  | `300`   |
    /// | `SYNC_HISTORY_LIMIT`         | `100`   |
    /// | `SYNC_DEFAULT_TOLERANCE_PCT` | `5.0`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_ttl_secs: env_parsed("SYNC_LOCK_TTL_SECS", defaults.lock_ttl_secs),
            conflict_window_secs: env_parsed("SYNC_CONFLICT_WINDOW_SECS", defaults.conflict_window_secs),
            history_limit: env_parsed("SYNC_HISTORY_LIMIT", defaults.history_limit),
            default_tolerance_percent: env_parsed(
                "SYNC_DEFAULT_TOLERANCE_PCT",
                defaults.default_tolerance_percent,
            ),
        }
    }

    /// Lock TTL as a [`Duration`].
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Conflict window as a chrono [`ChronoDuration`].
    pub fn conflict_window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.conflict_window_secs)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
