use crate::audio::StreamKind;

use std::{path::PathBuf, time::Duration};

use uuid::Uuid;

/// One playback progress tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Playback stream that produced the tick.
    pub stream_id: Uuid,
    /// Time since rendering started, never larger than `duration`.
    pub elapsed: Duration,
    /// Total duration of the loaded file.
    pub duration: Duration,
}

impl ProgressEvent {
    /// Time left until the end of the file.
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed)
    }
}

/// Why a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    /// Playback reached the end of the file.
    EndOfStream,
    /// `stop()` was requested.
    Stopped,
    /// Device or file failure while running.
    Failed(String),
}

impl CompletionReason {
    /// True when the stream ended because of an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, CompletionReason::Failed(_))
    }
}

/// Terminal notification raised exactly once per started stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Stream that completed.
    pub stream_id: Uuid,
    /// Capture or playback.
    pub kind: StreamKind,
    /// File the stream was writing or reading.
    pub path: PathBuf,
    /// Cause of completion.
    pub reason: CompletionReason,
}

/// Messages sent from stream workers to the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Periodic playback progress.
    Progress(ProgressEvent),
    /// A stream finished, naturally, on request, or with an error.
    Finished(CompletionEvent),
}
