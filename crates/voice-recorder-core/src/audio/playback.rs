use crate::{
    AudioError, CoreResult,
    audio::{
        AudioBackend, CompletionEvent, CompletionReason, LoadedAudio, ProgressEvent,
        SessionEvent, SessionSettings, StreamKind, StreamState, wav, worker::Worker,
    },
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Lower bound on the progress cadence so the polling loop never spins.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Renders a decoded file to an output device and reports progress.
///
/// The file is decoded once in `start()`. A worker thread then drives the
/// device and polls wall-clock time every `tick_interval`, emitting a
/// [`ProgressEvent`] per tick. At the end of the file it emits
/// `(duration, duration)` followed by an `EndOfStream` completion.
pub struct PlaybackStream {
    id: Uuid,
    backend: Arc<dyn AudioBackend>,
    events: Sender<SessionEvent>,
    settings: SessionSettings,
    state: StreamState,
    audio: Option<Arc<LoadedAudio>>,
    /// Checked by the polling loop and by the device callback.
    halt: Arc<AtomicBool>,
    worker: Option<Worker>,
}

struct PlaybackJob {
    id: Uuid,
    audio: Arc<LoadedAudio>,
    backend: Arc<dyn AudioBackend>,
    events: Sender<SessionEvent>,
    halt: Arc<AtomicBool>,
    tick_interval: Duration,
    ready: Sender<CoreResult<()>>,
}

impl PlaybackStream {
    /// Create an idle playback stream.
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
            audio: None,
            halt: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Decode `source` and start rendering it.
    ///
    /// # Errors
    ///
    /// - `DecodeError` if the file cannot be read; nothing is played.
    /// - `DeviceOrFileError` if the output device cannot be opened.
    #[track_caller]
    #[instrument(skip(self), fields(stream_id = %self.id))]
    pub fn start(&mut self, source: &Path) -> CoreResult<()> {
        if self.state != StreamState::Idle {
            return Err(AudioError::InvalidState {
                reason: format!("Playback stream cannot start from {:?}", self.state),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let audio = match wav::load(source) {
            Ok(audio) => Arc::new(audio),
            Err(e) => {
                self.state = StreamState::Stopped;
                return Err(e);
            }
        };

        self.halt.store(false, Ordering::Release);
        let (ready_tx, ready_rx) = bounded(1);

        let job = PlaybackJob {
            id: self.id,
            audio: Arc::clone(&audio),
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
            halt: Arc::clone(&self.halt),
            tick_interval: self.settings.tick_interval.max(MIN_TICK_INTERVAL),
            ready: ready_tx,
        };

        let worker = match Worker::spawn(StreamKind::Playback, "playback", move || job.run()) {
            Ok(w) => w,
            Err(e) => {
                self.state = StreamState::Stopped;
                return Err(e);
            }
        };

        let handshake = ready_rx.recv().unwrap_or_else(|_| {
            Err(AudioError::DeviceOrFileError {
                reason: "Playback worker exited before opening the device".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        });

        if let Err(e) = handshake {
            if let Err(join_err) = worker.join(self.settings.stop_timeout) {
                error!(error = ?join_err, "Failed to join playback worker after start failure");
            }
            self.state = StreamState::Stopped;
            return Err(e);
        }

        info!(
            path = ?source,
            duration_ms = audio.duration().as_millis(),
            "Playback started"
        );

        self.audio = Some(audio);
        self.worker = Some(worker);
        self.state = StreamState::Running;

        Ok(())
    }

    /// Halt rendering and join the worker. Safe to call at any time.
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
        self.halt.store(true, Ordering::Release);

        let result = worker.join(self.settings.stop_timeout);
        self.state = StreamState::Stopped;

        debug!("Playback stopped");

        result
    }

    /// True while the worker is rendering and no stop has been requested.
    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Decoded audio, available once started (e.g. for waveform display).
    pub fn loaded(&self) -> Option<&Arc<LoadedAudio>> {
        self.audio.as_ref()
    }

    /// Source file, once started.
    pub fn path(&self) -> Option<&Path> {
        self.audio.as_ref().map(|a| a.handle().path.as_path())
    }

    /// Duration of the loaded file.
    pub fn duration(&self) -> Option<Duration> {
        self.audio.as_ref().map(|a| a.duration())
    }

    /// Identifier carried by this stream's events.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = ?e, "Playback stream dropped without a clean stop");
        }
    }
}

impl PlaybackJob {
    fn run(self) {
        let PlaybackJob {
            id,
            audio,
            backend,
            events,
            halt,
            tick_interval,
            ready,
        } = self;

        let (error_tx, error_rx) = unbounded::<String>();
        let on_error = {
            let error_tx = error_tx.clone();
            Box::new(move |reason: String| {
                let _ = error_tx.try_send(reason);
            })
        };

        let output = match backend.open_output(Arc::clone(&audio), Arc::clone(&halt), on_error) {
            Ok(output) => output,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        if ready.send(Ok(())).is_err() {
            output.close();
            return;
        }

        let duration = audio.duration();
        let reason = poll_progress(id, duration, tick_interval, &halt, &error_rx, &events);

        output.close();
        drop(error_tx);

        if let CompletionReason::Failed(reason) = &reason {
            error!(reason = %reason, "Playback failed");
        }

        let path: PathBuf = audio.handle().path.clone();
        let event = SessionEvent::Finished(CompletionEvent {
            stream_id: id,
            kind: StreamKind::Playback,
            path,
            reason,
        });

        if events.send(event).is_err() {
            debug!("Session event receiver dropped");
        }
    }
}

/// Emit a progress tick every `tick_interval` until the end of the file,
/// a stop request, or a device error.
fn poll_progress(
    stream_id: Uuid,
    duration: Duration,
    tick_interval: Duration,
    halt: &AtomicBool,
    errors: &Receiver<String>,
    events: &Sender<SessionEvent>,
) -> CompletionReason {
    let started = Instant::now();

    loop {
        if halt.load(Ordering::Acquire) {
            return CompletionReason::Stopped;
        }

        if let Ok(reason) = errors.try_recv() {
            return CompletionReason::Failed(reason);
        }

        let elapsed = started.elapsed();

        if elapsed >= duration {
            let _ = events.send(SessionEvent::Progress(ProgressEvent {
                stream_id,
                elapsed: duration,
                duration,
            }));
            return CompletionReason::EndOfStream;
        }

        let _ = events.send(SessionEvent::Progress(ProgressEvent {
            stream_id,
            elapsed,
            duration,
        }));

        thread::sleep(tick_interval.min(duration - elapsed));
    }
}
