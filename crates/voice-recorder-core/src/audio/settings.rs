use crate::audio::StreamFormat;

use std::time::Duration;

/// Default playback progress cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(30);

/// Default bound on joining a stream worker.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of blocks the capture hand-off queue can hold.
///
/// At typical 10ms device buffers this is ~5s of audio before the
/// callback starts dropping blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Tunables shared by the session controller and the streams it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Format used for new recordings.
    pub format: StreamFormat,
    /// Interval between playback progress ticks.
    pub tick_interval: Duration,
    /// Maximum time `stop()` waits for a worker to join.
    pub stop_timeout: Duration,
    /// Capacity of the bounded callback-to-writer queue, in blocks.
    pub queue_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            format: StreamFormat::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
