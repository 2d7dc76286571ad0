use crate::{CoreResult, audio::LoadedAudio, audio::StreamFormat};

use std::sync::{Arc, atomic::AtomicBool};

/// Receives each block of interleaved input samples on the device callback
/// context. Implementations must not block.
pub type BlockCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Receives asynchronous device failures.
pub type ErrorCallback = Box<dyn FnMut(String) + Send + 'static>;

/// An open device stream. Closing it guarantees no further callbacks.
///
/// Device streams are not required to be `Send`: they are opened, driven and
/// closed on the owning stream's worker thread.
pub trait ActiveStream {
    /// Stop the device and release it.
    fn close(self: Box<Self>);
}

/// Source of input and output devices for the session engine.
pub trait AudioBackend: Send + Sync + 'static {
    /// Open an input device in `format` and start delivering blocks.
    fn open_input(
        &self,
        format: StreamFormat,
        on_block: BlockCallback,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>>;

    /// Open an output device and start rendering `audio` from its beginning.
    ///
    /// Once `halt` is set the device must render silence.
    fn open_output(
        &self,
        audio: Arc<LoadedAudio>,
        halt: Arc<AtomicBool>,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>>;
}
