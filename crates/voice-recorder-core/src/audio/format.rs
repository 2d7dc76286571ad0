use std::{fmt, time::Duration};

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default capture channel count (stereo).
pub const DEFAULT_CHANNELS: u16 = 2;

/// Interleaved `f32` samples handed from the device callback to the writer.
pub type AudioBlock = Vec<f32>;

/// Sample rate and channel layout shared by a stream and its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl StreamFormat {
    /// Playback time covered by `frames` frames in this format.
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

/// Lifecycle of a capture or playback stream.
///
/// ```text
/// Idle → Running → Stopping → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, not started.
    Idle,
    /// Worker is active and the device is open.
    Running,
    /// Stop requested, waiting for the worker to join.
    Stopping,
    /// Worker joined (or was abandoned after a stop timeout).
    Stopped,
}

/// Which side of the session a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Recording from an input device to a file.
    Capture,
    /// Rendering a file to an output device.
    Playback,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Capture => write!(f, "Capture"),
            StreamKind::Playback => write!(f, "Playback"),
        }
    }
}
