//! Voice Recorder Core Library
//!
//! Audio session engine for a desktop voice recorder: one capture or playback
//! stream at a time, streamed between a CPAL device and a WAV file on worker
//! threads, with progress and completion delivered as events to the control
//! thread.
//!
//! # Example
//!
//! ```no_run
//! use voice_recorder_core::{CoreResult, CpalBackend, SessionController, SessionSettings};
//!
//! use std::{path::Path, sync::Arc, thread::sleep, time::Duration};
//!
//! fn main() -> CoreResult<()> {
//!     let mut session = SessionController::new(Arc::new(CpalBackend::new()), SessionSettings::default());
//!     session.on_progress(Box::new(|p| println!("{:?} / {:?}", p.elapsed, p.duration)));
//!
//!     session.start_recording(Path::new("Recording_2026-01-01-13-00-00.wav"))?;
//!     sleep(Duration::from_secs(3));
//!     session.stop_recording()?;
//!
//!     session.start_playing(Path::new("Recording_2026-01-01-13-00-00.wav"))?;
//!     while session.is_playing() {
//!         session.wait_and_dispatch(Duration::from_millis(100));
//!     }
//!     session.dispatch_pending();
//!     Ok(())
//! }
//! ```

mod audio;
mod catalog;
mod error;

pub use {
    audio::{
        ActiveStream, AudioBackend, AudioBlock, AudioFileHandle, BlockCallback, CaptureStream,
        CompletionEvent, CompletionReason, CpalBackend, DEFAULT_CHANNELS, DEFAULT_QUEUE_CAPACITY,
        DEFAULT_SAMPLE_RATE, DEFAULT_STOP_TIMEOUT, DEFAULT_TICK_INTERVAL, ErrorCallback,
        FinishedHandler, LoadedAudio, PlaybackStream, ProgressEvent, ProgressHandler,
        SessionController, SessionEvent, SessionSettings, StreamFormat, StreamKind, StreamState,
        load_audio, read_audio_header,
    },
    catalog::{RecordingCatalog, RecordingEntry, file_name_for, parse_timestamp},
    error::AudioError,
    error::Result as CoreResult,
};

#[cfg(test)]
mod tests;
