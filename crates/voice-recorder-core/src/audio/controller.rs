use crate::{
    CoreResult,
    audio::{
        AudioBackend, CaptureStream, CompletionEvent, PlaybackStream, ProgressEvent,
        SessionEvent, SessionSettings, StreamKind, StreamState,
    },
};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info, instrument};

/// Subscriber for stream completion.
pub type FinishedHandler = Box<dyn FnMut(&CompletionEvent) + Send + 'static>;

/// Subscriber for playback progress ticks.
pub type ProgressHandler = Box<dyn FnMut(&ProgressEvent) + Send + 'static>;

/// Single owner of "what is currently happening".
///
/// Holds at most one capture and one playback stream, and never lets both
/// run at once: starting one stops the other first. Stream workers only
/// send [`SessionEvent`]s; all state changes happen on the thread that owns
/// the controller, inside the `start_*`/`stop_*` calls and [`handle_event`].
///
/// # Thread Safety
///
/// SessionController is NOT meant to be shared. Construct it once on the
/// control thread and pass it by reference to the UI layer.
///
/// [`handle_event`]: SessionController::handle_event
pub struct SessionController {
    backend: Arc<dyn AudioBackend>,
    settings: SessionSettings,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    capture: Option<CaptureStream>,
    playback: Option<PlaybackStream>,
    on_recording_finished: Option<FinishedHandler>,
    on_playing_finished: Option<FinishedHandler>,
    on_progress: Option<ProgressHandler>,
}

impl SessionController {
    /// Create a controller that opens devices through `backend`.
    pub fn new(backend: Arc<dyn AudioBackend>, settings: SessionSettings) -> Self {
        let (events_tx, events_rx) = unbounded();

        Self {
            backend,
            settings,
            events_tx,
            events_rx,
            capture: None,
            playback: None,
            on_recording_finished: None,
            on_playing_finished: None,
            on_progress: None,
        }
    }

    /// Subscribe to capture completion (explicit stop or failure).
    pub fn on_recording_finished(&mut self, handler: FinishedHandler) {
        self.on_recording_finished = Some(handler);
    }

    /// Subscribe to playback completion (end of file, stop, or failure).
    pub fn on_playing_finished(&mut self, handler: FinishedHandler) {
        self.on_playing_finished = Some(handler);
    }

    /// Subscribe to playback progress ticks of the current playback.
    pub fn on_progress(&mut self, handler: ProgressHandler) {
        self.on_progress = Some(handler);
    }

    /// Start recording into `path`, stopping any playback first.
    ///
    /// No-op if a recording is already running.
    ///
    /// # Errors
    ///
    /// Propagates `FileAlreadyExists`, `DeviceOrFileError`, or a
    /// `StopTimeout` from stopping the playback. On error no recording is
    /// registered as current.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start_recording(&mut self, path: &Path) -> CoreResult<()> {
        if self.is_recording() {
            debug!("Recording already running, ignoring start");
            return Ok(());
        }

        self.stop_playing()?;
        // Join a capture that ended on its own but was not reaped yet.
        self.stop_recording()?;

        let mut stream = CaptureStream::new(
            Arc::clone(&self.backend),
            self.events_tx.clone(),
            self.settings,
        );
        stream.start(path, self.settings.format)?;
        self.capture = Some(stream);

        info!(path = ?path, "Recording session started");

        Ok(())
    }

    /// Stop the active recording. No-op (and no event) when none is active.
    ///
    /// The recording-finished notification follows through the event path.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self) -> CoreResult<()> {
        match self.capture.take() {
            Some(mut stream) => stream.stop(),
            None => Ok(()),
        }
    }

    /// Start playing `path`, stopping any recording first.
    ///
    /// No-op if a playback is already running.
    ///
    /// # Errors
    ///
    /// Propagates `DecodeError`, `DeviceOrFileError`, or a `StopTimeout`
    /// from stopping the recording. On error no playback is registered.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start_playing(&mut self, path: &Path) -> CoreResult<()> {
        if self.is_playing() {
            debug!("Playback already running, ignoring start");
            return Ok(());
        }

        self.stop_recording()?;
        self.stop_playing()?;

        let mut stream = PlaybackStream::new(
            Arc::clone(&self.backend),
            self.events_tx.clone(),
            self.settings,
        );
        stream.start(path)?;
        self.playback = Some(stream);

        info!(path = ?path, "Playback session started");

        Ok(())
    }

    /// Stop the active playback. No-op (and no event) when none is active.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop_playing(&mut self) -> CoreResult<()> {
        match self.playback.take() {
            Some(mut stream) => stream.stop(),
            None => Ok(()),
        }
    }

    /// Stop whichever stream is active.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) -> CoreResult<()> {
        let recording = self.stop_recording();
        let playing = self.stop_playing();
        recording.and(playing)
    }

    /// Apply one worker event on the control thread and notify subscribers.
    ///
    /// Completion of the current stream reaps it (joins its worker), so a
    /// natural end or a device error leaves the controller in the same state
    /// as an explicit stop. Progress ticks from streams that are no longer
    /// current are discarded.
    #[instrument(skip(self, event))]
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Progress(progress) => {
                let is_current = self
                    .playback
                    .as_ref()
                    .is_some_and(|p| p.id() == progress.stream_id);

                if !is_current {
                    return;
                }

                if let Some(handler) = self.on_progress.as_mut() {
                    handler(&progress);
                }
            }
            SessionEvent::Finished(completion) => {
                debug!(
                    kind = %completion.kind,
                    reason = ?completion.reason,
                    "Stream finished"
                );

                match completion.kind {
                    StreamKind::Capture => {
                        if self
                            .capture
                            .as_ref()
                            .is_some_and(|c| c.id() == completion.stream_id)
                        {
                            if let Err(e) = self.stop_recording() {
                                error!(error = ?e, "Failed to reap finished capture");
                            }
                        }
                        if let Some(handler) = self.on_recording_finished.as_mut() {
                            handler(&completion);
                        }
                    }
                    StreamKind::Playback => {
                        if self
                            .playback
                            .as_ref()
                            .is_some_and(|p| p.id() == completion.stream_id)
                        {
                            if let Err(e) = self.stop_playing() {
                                error!(error = ?e, "Failed to reap finished playback");
                            }
                        }
                        if let Some(handler) = self.on_playing_finished.as_mut() {
                            handler(&completion);
                        }
                    }
                }
            }
        }
    }

    /// Handle every event already queued without blocking.
    ///
    /// Returns the number of events handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for an event, then handle everything queued.
    ///
    /// Returns the number of events handled.
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                1 + self.dispatch_pending()
            }
            Err(_) => 0,
        }
    }

    /// A receiver for forwarding worker events into another loop.
    ///
    /// Events taken from it must be passed back to [`handle_event`] on the
    /// control thread.
    ///
    /// [`handle_event`]: SessionController::handle_event
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// True while a recording is running.
    pub fn is_recording(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_running())
    }

    /// True while a playback is running.
    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_running())
    }

    /// State of the current capture stream (`Idle` when there is none).
    pub fn recording_state(&self) -> StreamState {
        self.capture
            .as_ref()
            .map_or(StreamState::Idle, |c| c.state())
    }

    /// State of the current playback stream (`Idle` when there is none).
    pub fn playback_state(&self) -> StreamState {
        self.playback
            .as_ref()
            .map_or(StreamState::Idle, |p| p.state())
    }

    /// Destination of the current recording.
    pub fn current_recording_path(&self) -> Option<PathBuf> {
        self.capture
            .as_ref()
            .and_then(|c| c.path())
            .map(Path::to_path_buf)
    }

    /// Source of the current playback.
    pub fn current_playback_path(&self) -> Option<PathBuf> {
        self.playback
            .as_ref()
            .and_then(|p| p.path())
            .map(Path::to_path_buf)
    }

    /// The current playback stream, e.g. to read its decoded samples.
    pub fn current_playback(&self) -> Option<&PlaybackStream> {
        self.playback.as_ref()
    }

    /// Settings applied to new streams.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = ?e, "Session shutdown failed");
        }
    }
}
