use crate::config::{default_channels, default_queue_capacity, default_sample_rate};

use serde::{Deserialize, Serialize};

/// Capture format and buffering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Recording sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Recording channel count.
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Blocks buffered between the device callback and the file writer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
