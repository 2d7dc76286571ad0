use crate::audio::StreamKind;

use std::{path::PathBuf, time::Duration};

use error_location::ErrorLocation;
use thiserror::Error;

/// Audio session errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Capture destination already exists. New recordings always need a fresh name.
    #[error("Recording file already exists: {path:?} {location}")]
    FileAlreadyExists {
        /// Path that collided.
        path: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device unavailable or file could not be opened/written.
    #[error("Audio device or file error: {reason} {location}")]
    DeviceOrFileError {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Playback source could not be read or decoded.
    #[error("Failed to decode {path:?}: {reason} {location}")]
    DecodeError {
        /// File that failed to decode.
        path: PathBuf,
        /// Description of the decode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A stream worker did not terminate within the configured bound.
    #[error("{kind} worker did not stop within {timeout:?} {location}")]
    StopTimeout {
        /// Which stream failed to stop.
        kind: StreamKind,
        /// The join bound that was exceeded.
        timeout: Duration,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation not valid for the stream's current state.
    #[error("Invalid stream state: {reason} {location}")]
    InvalidState {
        /// Description of the violated precondition.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Recording catalog could not be read or persisted.
    #[error("Catalog error: {reason} {location}")]
    CatalogError {
        /// Description of the catalog failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Playback resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;
