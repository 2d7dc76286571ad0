use crate::{
    AudioError, CoreResult,
    audio::{
        AudioBackend, AudioBlock, CompletionEvent, CompletionReason, SessionEvent,
        SessionSettings, StreamFormat, StreamKind, StreamState, wav::WavFileWriter, worker::Worker,
    },
};

use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// How long the writer waits for a block before re-checking the stop flag.
const WRITER_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Records an input device into a new WAV file on a dedicated worker thread.
///
/// The device callback only copies each block into a bounded queue; the
/// worker drains the queue in FIFO order and appends to the file. `stop()`
/// joins the worker, so no write happens after it returns.
pub struct CaptureStream {
    id: Uuid,
    backend: Arc<dyn AudioBackend>,
    events: Sender<SessionEvent>,
    settings: SessionSettings,
    state: StreamState,
    path: Option<PathBuf>,
    /// Set before the device is closed so an in-flight callback stops
    /// enqueuing as soon as `stop()` is called.
    shutdown: Arc<AtomicBool>,
    worker: Option<Worker>,
}

/// Everything the capture worker owns.
struct CaptureJob {
    id: Uuid,
    path: PathBuf,
    format: StreamFormat,
    writer: WavFileWriter,
    backend: Arc<dyn AudioBackend>,
    events: Sender<SessionEvent>,
    shutdown: Arc<AtomicBool>,
    queue_capacity: usize,
    ready: Sender<CoreResult<()>>,
}

impl CaptureStream {
    /// Create an idle capture stream.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        events: Sender<SessionEvent>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            events,
            settings,
            state: StreamState::Idle,
            path: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Create `destination` exclusively and start recording into it.
    ///
    /// # Errors
    ///
    /// - `FileAlreadyExists` if `destination` exists.
    /// - `DeviceOrFileError` if the file or input device cannot be opened.
    ///   The empty file is removed and the stream ends up `Stopped`.
    #[track_caller]
    #[instrument(skip(self), fields(stream_id = %self.id))]
    pub fn start(&mut self, destination: &Path, format: StreamFormat) -> CoreResult<()> {
        if self.state != StreamState::Idle {
            return Err(AudioError::InvalidState {
                reason: format!("Capture stream cannot start from {:?}", self.state),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AudioError::FileAlreadyExists {
                    path: destination.to_path_buf(),
                    location: ErrorLocation::from(Location::caller()),
                },
                _ => AudioError::DeviceOrFileError {
                    reason: format!("Failed to create {:?}: {}", destination, e),
                    location: ErrorLocation::from(Location::caller()),
                },
            })?;

        let writer = match WavFileWriter::new(file, destination, format) {
            Ok(w) => w,
            Err(e) => {
                self.abort_start(destination);
                return Err(e);
            }
        };

        self.shutdown.store(false, Ordering::Release);
        let (ready_tx, ready_rx) = bounded(1);

        let job = CaptureJob {
            id: self.id,
            path: destination.to_path_buf(),
            format,
            writer,
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
            shutdown: Arc::clone(&self.shutdown),
            queue_capacity: self.settings.queue_capacity.max(1),
            ready: ready_tx,
        };

        let worker = match Worker::spawn(StreamKind::Capture, "capture-writer", move || job.run())
        {
            Ok(w) => w,
            Err(e) => {
                self.abort_start(destination);
                return Err(e);
            }
        };

        let handshake = ready_rx.recv().unwrap_or_else(|_| {
            Err(AudioError::DeviceOrFileError {
                reason: "Capture worker exited before opening the device".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        });

        if let Err(e) = handshake {
            if let Err(join_err) = worker.join(self.settings.stop_timeout) {
                warn!(error = ?join_err, "Failed to join capture worker after start failure");
            }
            self.abort_start(destination);
            return Err(e);
        }

        self.worker = Some(worker);
        self.path = Some(destination.to_path_buf());
        self.state = StreamState::Running;

        info!(
            path = ?destination,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Capture started"
        );

        Ok(())
    }

    /// Stop capturing, drain queued blocks, finalize the file and join.
    ///
    /// Idempotent. After `Ok(())` the file is complete and readable.
    ///
    /// # Errors
    ///
    /// `StopTimeout` if the worker does not exit within the configured
    /// bound. The stream is marked `Stopped` regardless.
    #[track_caller]
    #[instrument(skip(self), fields(stream_id = %self.id))]
    pub fn stop(&mut self) -> CoreResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.state = StreamState::Stopping;
        self.shutdown.store(true, Ordering::Release);

        let result = worker.join(self.settings.stop_timeout);
        self.state = StreamState::Stopped;

        if result.is_ok() {
            info!(path = ?self.path, "Capture stopped");
        }

        result
    }

    /// True while the worker is alive and no stop has been requested.
    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Destination file, once started.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Identifier carried by this stream's events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn abort_start(&mut self, destination: &Path) {
        if let Err(e) = fs::remove_file(destination) {
            warn!(path = ?destination, error = %e, "Failed to remove unused recording file");
        }
        self.state = StreamState::Stopped;
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = ?e, "Capture stream dropped without a clean stop");
        }
    }
}

impl CaptureJob {
    fn run(self) {
        let CaptureJob {
            id,
            path,
            format,
            mut writer,
            backend,
            events,
            shutdown,
            queue_capacity,
            ready,
        } = self;

        let (block_tx, block_rx) = bounded::<AudioBlock>(queue_capacity);
        let (error_tx, error_rx) = unbounded::<String>();
        let dropped = Arc::new(AtomicU64::new(0));

        let on_block = {
            let shutdown = Arc::clone(&shutdown);
            let dropped = Arc::clone(&dropped);
            Box::new(move |data: &[f32]| {
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                if block_tx.try_send(data.to_vec()).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            })
        };

        // The worker keeps `error_tx` alive so the error channel never reads
        // as disconnected while the writer loop selects on it.
        let on_error = {
            let error_tx = error_tx.clone();
            Box::new(move |reason: String| {
                let _ = error_tx.try_send(reason);
            })
        };

        let input = match backend.open_input(format, on_block, on_error) {
            Ok(input) => input,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        if ready.send(Ok(())).is_err() {
            input.close();
            return;
        }

        let interruption = write_until_stopped(&mut writer, &block_rx, &error_rx, &shutdown);
        let mut writer_ok = !matches!(interruption, Some(Interruption::Writer(_)));
        let mut failure = interruption.map(Interruption::into_reason);

        // Closing the device drops the callback and its queue sender, so the
        // drain below sees every block that was accepted before shutdown.
        input.close();

        let mut drained = 0usize;
        for block in block_rx.try_iter() {
            if writer_ok {
                if let Err(e) = writer.write_block(&block) {
                    writer_ok = false;
                    if failure.is_none() {
                        failure = Some(e.to_string());
                    }
                }
            }
            drained += 1;
        }

        match writer.finalize() {
            Ok(handle) => {
                debug!(
                    frames = handle.frames,
                    drained_blocks = drained,
                    duration_ms = handle.duration().as_millis(),
                    "Capture file finalized"
                );
            }
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e.to_string());
                }
            }
        }

        drop(error_tx);

        let dropped = dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped_blocks = dropped, "Capture queue was full, blocks dropped");
        }

        let reason = match failure {
            Some(reason) => {
                error!(path = ?path, reason = %reason, "Capture failed");
                CompletionReason::Failed(reason)
            }
            None => CompletionReason::Stopped,
        };

        let event = SessionEvent::Finished(CompletionEvent {
            stream_id: id,
            kind: StreamKind::Capture,
            path,
            reason,
        });

        if events.send(event).is_err() {
            debug!("Session event receiver dropped");
        }
    }
}

/// Why the writer loop ended before a stop request.
enum Interruption {
    Device(String),
    Writer(String),
}

impl Interruption {
    fn into_reason(self) -> String {
        match self {
            Interruption::Device(reason) | Interruption::Writer(reason) => reason,
        }
    }
}

/// Append queued blocks until shutdown or a failure.
fn write_until_stopped(
    writer: &mut WavFileWriter,
    blocks: &Receiver<AudioBlock>,
    errors: &Receiver<String>,
    shutdown: &AtomicBool,
) -> Option<Interruption> {
    loop {
        if shutdown.load(Ordering::Acquire) {
            return None;
        }

        select! {
            recv(blocks) -> block => match block {
                Ok(block) => {
                    if let Err(e) = writer.write_block(&block) {
                        return Some(Interruption::Writer(e.to_string()));
                    }
                }
                Err(_) => {
                    return Some(Interruption::Device(
                        "Input device closed unexpectedly".to_string(),
                    ));
                }
            },
            recv(errors) -> reason => {
                if let Ok(reason) = reason {
                    return Some(Interruption::Device(reason));
                }
            },
            default(WRITER_POLL_INTERVAL) => {}
        }
    }
}
