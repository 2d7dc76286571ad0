use crate::config::{default_stop_timeout_ms, default_tick_interval_ms};

use serde::{Deserialize, Serialize};

/// Progress cadence and stop bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Interval between progress updates, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long a stop waits for a stream worker, in milliseconds.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}
