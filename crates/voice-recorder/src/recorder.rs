//! Record, play and browse recordings on top of the session controller and
//! the catalog. Tray-agnostic: the app turns the returned outcomes and
//! [`Notice`]s into icon and tooltip updates.

use crate::{AppResult, NavigationSignal, navigation, waveform::Waveform};

use std::{collections::HashMap, path::PathBuf};

use chrono::NaiveDateTime;
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info, instrument, warn};
use voice_recorder_core::{
    CompletionEvent, CompletionReason, ProgressEvent, RecordingCatalog, RecordingEntry,
    SessionController, SessionEvent,
};

/// Result of a play, stop or navigation request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlayOutcome {
    /// `entry` started playing.
    Started(RecordingEntry),
    /// The running playback was stopped.
    Stopped,
    /// No recording to play, or its file is gone.
    NothingToPlay,
    /// Request ignored (recording in progress, or no neighbor that way).
    Ignored,
}

/// Something the UI should reflect after a session event.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Notice {
    /// A recording was catalogued and became current.
    RecordingSaved(RecordingEntry),
    /// A recording ended with an error; any audio written is kept.
    RecordingFailed(String),
    /// The current playback ended for `reason`.
    PlaybackFinished(CompletionReason),
    /// Position of the current playback.
    Progress(ProgressEvent),
}

/// Controller subscriptions, queued until the event that raised them has
/// been handled.
enum Raised {
    Recording(CompletionEvent),
    Playback(CompletionEvent),
    Progress(ProgressEvent),
}

/// Owns the session and the catalog and applies the app's policies.
pub(crate) struct Recorder {
    session: SessionController,
    catalog: RecordingCatalog,
    /// Entry the next play or navigation starts from.
    current: Option<RecordingEntry>,
    /// Entries allocated for recordings whose completion is still pending,
    /// keyed by file path.
    pending: HashMap<PathBuf, RecordingEntry>,
    raised: Receiver<Raised>,
}

impl Recorder {
    pub(crate) fn new(mut session: SessionController, catalog: RecordingCatalog) -> Self {
        let (raised_tx, raised) = unbounded();
        subscribe(&mut session, raised_tx);

        let current = catalog.most_recent().cloned();

        Self {
            session,
            catalog,
            current,
            pending: HashMap::new(),
            raised,
        }
    }

    /// Allocate a catalog name for `now` and record into it.
    ///
    /// Returns `None` if a recording is already running.
    #[instrument(skip(self))]
    pub(crate) fn start_recording(&mut self, now: NaiveDateTime) -> AppResult<Option<RecordingEntry>> {
        if self.session.is_recording() {
            debug!("Already recording");
            return Ok(None);
        }

        let entry = self.catalog.allocate(now)?;
        self.session.start_recording(&entry.path)?;
        self.pending.insert(entry.path.clone(), entry.clone());

        info!(file_name = %entry.file_name, "Recording started");

        Ok(Some(entry))
    }

    pub(crate) fn stop_recording(&mut self) -> AppResult<()> {
        self.session.stop_recording()?;
        Ok(())
    }

    /// Stop the playback, or play the current (else most recent) recording.
    #[instrument(skip(self))]
    pub(crate) fn toggle_playback(&mut self) -> AppResult<PlayOutcome> {
        if self.session.is_playing() {
            self.session.stop_playing()?;
            return Ok(PlayOutcome::Stopped);
        }

        let target = self
            .current
            .as_ref()
            .filter(|c| self.catalog.contains(&c.file_name))
            .or_else(|| self.catalog.most_recent())
            .cloned();

        match target {
            Some(entry) => self.play(entry),
            None => {
                warn!("No recording to play");
                Ok(PlayOutcome::NothingToPlay)
            }
        }
    }

    /// Play the neighbor `signal` selects. Ignored while recording.
    #[instrument(skip(self))]
    pub(crate) fn navigate(&mut self, signal: NavigationSignal) -> AppResult<PlayOutcome> {
        if self.session.is_recording() {
            debug!("Navigation ignored while recording");
            return Ok(PlayOutcome::Ignored);
        }

        match navigation::navigate(&self.catalog, self.current.as_ref(), signal).cloned() {
            Some(target) => self.play(target),
            None => {
                debug!("No recording in that direction");
                Ok(PlayOutcome::Ignored)
            }
        }
    }

    /// Stop any playback and start `entry`.
    fn play(&mut self, entry: RecordingEntry) -> AppResult<PlayOutcome> {
        let path = self.catalog.path_of(&entry).to_path_buf();

        if !path.exists() {
            warn!(path = ?path, "Recording file missing");
            return Ok(PlayOutcome::NothingToPlay);
        }

        self.session.stop_playing()?;
        self.session.start_playing(&path)?;

        info!(file_name = %entry.file_name, "Playing recording");
        self.current = Some(entry.clone());

        Ok(PlayOutcome::Started(entry))
    }

    /// Apply a worker event on the control thread.
    pub(crate) fn apply(&mut self, event: SessionEvent) -> Vec<Notice> {
        self.session.handle_event(event);
        self.collect_notices()
    }

    /// Stop whatever runs and apply the resulting completions, so a
    /// recording in progress is finalized and catalogued.
    #[instrument(skip(self))]
    pub(crate) fn shutdown(&mut self) -> Vec<Notice> {
        if let Err(e) = self.session.shutdown() {
            error!(error = ?e, "Failed to stop audio session");
        }
        self.session.dispatch_pending();
        self.collect_notices()
    }

    /// Waveform of the current playback's decoded audio.
    pub(crate) fn playback_waveform(&self) -> Option<Waveform> {
        self.session
            .current_playback()
            .and_then(|p| p.loaded())
            .map(|audio| Waveform::from_audio(audio))
    }

    /// Receiver of worker events, to be fed back through [`Recorder::apply`].
    pub(crate) fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.session.event_receiver()
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub(crate) fn current(&self) -> Option<&RecordingEntry> {
        self.current.as_ref()
    }

    pub(crate) fn catalog(&self) -> &RecordingCatalog {
        &self.catalog
    }

    fn collect_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        while let Ok(raised) = self.raised.try_recv() {
            match raised {
                Raised::Recording(done) => self.recording_finished(done, &mut notices),
                Raised::Playback(done) => notices.push(Notice::PlaybackFinished(done.reason)),
                Raised::Progress(progress) => {
                    // The final tick arrives after the worker has exited, so
                    // match on the stream rather than on `is_playing`.
                    let is_current = self
                        .session
                        .current_playback()
                        .is_some_and(|p| p.id() == progress.stream_id);
                    if is_current {
                        notices.push(Notice::Progress(progress));
                    }
                }
            }
        }

        notices
    }

    /// Catalogue the finished recording and make it current.
    fn recording_finished(&mut self, done: CompletionEvent, notices: &mut Vec<Notice>) {
        let Some(entry) = self.pending.remove(&done.path) else {
            warn!(path = ?done.path, "Completion for an unknown recording");
            return;
        };

        if entry.path.exists() {
            match self.catalog.insert(entry.clone()) {
                Ok(()) => {
                    info!(file_name = %entry.file_name, "Recording saved");
                    self.current = Some(entry.clone());
                    notices.push(Notice::RecordingSaved(entry));
                }
                Err(e) => error!(error = ?e, "Failed to catalogue recording"),
            }
        }

        if let CompletionReason::Failed(reason) = done.reason {
            notices.push(Notice::RecordingFailed(reason));
        }
    }
}

fn subscribe(session: &mut SessionController, raised: Sender<Raised>) {
    let tx = raised.clone();
    session.on_recording_finished(Box::new(move |done| {
        let _ = tx.send(Raised::Recording(done.clone()));
    }));
    let tx = raised.clone();
    session.on_playing_finished(Box::new(move |done| {
        let _ = tx.send(Raised::Playback(done.clone()));
    }));
    session.on_progress(Box::new(move |progress| {
        let _ = raised.send(Raised::Progress(*progress));
    }));
}
