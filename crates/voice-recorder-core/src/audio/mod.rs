mod backend;
mod capture;
mod controller;
mod cpal_backend;
mod events;
mod format;
mod playback;
mod resampler;
mod settings;
pub(crate) mod wav;
mod worker;

pub(crate) use {cpal_backend::pick_input_format, resampler::Resampler};

pub use {
    backend::{ActiveStream, AudioBackend, BlockCallback, ErrorCallback},
    capture::CaptureStream,
    controller::{FinishedHandler, ProgressHandler, SessionController},
    cpal_backend::CpalBackend,
    events::{CompletionEvent, CompletionReason, ProgressEvent, SessionEvent},
    format::{
        AudioBlock, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, StreamFormat, StreamKind, StreamState,
    },
    playback::PlaybackStream,
    settings::{
        DEFAULT_QUEUE_CAPACITY, DEFAULT_STOP_TIMEOUT, DEFAULT_TICK_INTERVAL, SessionSettings,
    },
    wav::{AudioFileHandle, LoadedAudio, load as load_audio, read_header as read_audio_header},
};
