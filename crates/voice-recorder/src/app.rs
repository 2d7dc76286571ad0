use crate::{
    AppCommand, AppError, AppResult, NavigationSignal, Notice, PlayOutcome, Recorder,
    TrayCommand, TrayIconState, TrayMenuIds, tray_icon_state::progress_tooltip,
    waveform::Waveform,
};

use std::{panic::Location, time::Duration};

use chrono::Local;
use error_location::ErrorLocation;
use tao::event_loop::EventLoopProxy;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument};
use tray_icon::menu::MenuEvent;
use voice_recorder_core::CompletionReason;

/// Tooltip when there is nothing to play.
pub(crate) const FILE_NOT_FOUND: &str = "File Not Found!";

/// Main application state.
///
/// Runs on the async runtime thread and owns the [`Recorder`], so every
/// session state change happens here. Tray updates go back to the main thread
/// through `tray_proxy` because `TrayIcon` is `!Send`.
pub struct App {
    recorder: Recorder,
    tray_proxy: EventLoopProxy<TrayCommand>,
    tray_state: TrayIconState,
    last_tooltip: Option<String>,
    /// Waveform of the playing recording and the column last drawn.
    waveform: Option<(Waveform, usize)>,
    menu_ids: TrayMenuIds,
    command_tx: mpsc::Sender<AppCommand>,
    command_rx: mpsc::Receiver<AppCommand>,
    shutdown_tx: watch::Sender<bool>,
}

impl App {
    pub(crate) fn new(
        recorder: Recorder,
        tray_proxy: EventLoopProxy<TrayCommand>,
        menu_ids: TrayMenuIds,
        command_tx: mpsc::Sender<AppCommand>,
        command_rx: mpsc::Receiver<AppCommand>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            recorder,
            tray_proxy,
            tray_state: TrayIconState::Idle,
            last_tooltip: None,
            waveform: None,
            menu_ids,
            command_tx,
            command_rx,
            shutdown_tx,
        }
    }

    /// Run the main application event loop.
    ///
    /// Exits the tray event loop only after the session has been stopped, so
    /// a recording in progress is finalized and catalogued before the process
    /// ends.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!(recordings = self.recorder.catalog().len(), "Voice Recorder starting");

        // MenuEvent::receiver() is a crossbeam_channel::Receiver with a
        // blocking recv(). When tray_event_rx is dropped the next
        // blocking_send() fails and the task ends.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        // Worker events are forwarded here and applied with Recorder::apply
        // so all session state changes stay on this task. Dropping
        // `forwarder_stop` ends the forwarder, which drops the last sender.
        let session_events = self.recorder.event_receiver();
        let (session_event_tx, mut session_event_rx) = mpsc::channel(64);
        let (forwarder_stop, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let session_handle = tokio::task::spawn_blocking(move || {
            loop {
                crossbeam_channel::select! {
                    recv(session_events) -> event => match event {
                        Ok(event) => {
                            if session_event_tx.blocking_send(event).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            }
        });

        loop {
            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    if let Err(e) = self.handle_tray_event(event).await {
                        error!(error = ?e, "Failed to handle tray event");
                    }
                }

                Some(event) = session_event_rx.recv() => {
                    let notices = self.recorder.apply(event);
                    self.show_notices(notices);
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::Navigate(signal) => self.navigate(signal),
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        drop(tray_event_rx);

        // Apply everything the forwarder already took, then stop the session;
        // completions raised by the stop are dispatched directly.
        drop(forwarder_stop);
        while let Some(event) = session_event_rx.recv().await {
            let notices = self.recorder.apply(event);
            self.show_notices(notices);
        }

        let notices = self.recorder.shutdown();
        self.show_notices(notices);

        for (name, handle) in [("Tray", tray_handle), ("Session", session_handle)] {
            match tokio::time::timeout(Duration::from_secs(1), handle).await {
                Ok(Ok(())) => debug!(forwarder = name, "Event forwarder stopped cleanly"),
                Ok(Err(e)) => error!(forwarder = name, error = ?e, "Event forwarder task panicked"),
                Err(_) => debug!(
                    forwarder = name,
                    "Event forwarder did not stop within timeout, \
                         will be cleaned up on exit"
                ),
            }
        }

        let _ = self.shutdown_tx.send(true);
        info!("Voice Recorder shut down successfully");

        self.send_tray(TrayCommand::Shutdown);

        Ok(())
    }

    /// Handle tray menu events.
    #[instrument(skip(self))]
    async fn handle_tray_event(&mut self, event: MenuEvent) -> AppResult<()> {
        let event_id = &event.id;

        if *event_id == self.menu_ids.record {
            let started = self.recorder.start_recording(Local::now().naive_local());
            self.settle(started.map(|_| None), "Failed to start recording");
        } else if *event_id == self.menu_ids.stop_recording {
            let stopped = self.recorder.stop_recording();
            self.settle(stopped.map(|()| None), "Failed to stop recording");
        } else if *event_id == self.menu_ids.toggle_playback {
            let outcome = self.recorder.toggle_playback();
            self.settle(outcome.map(Some), "Failed to toggle playback");
        } else if *event_id == self.menu_ids.previous {
            self.navigate(NavigationSignal::Previous);
        } else if *event_id == self.menu_ids.next {
            self.navigate(NavigationSignal::Next);
        } else if *event_id == self.menu_ids.exit {
            info!("Exit requested from tray menu");
            self.command_tx
                .send(AppCommand::Shutdown)
                .await
                .map_err(|e| AppError::ChannelSendFailed {
                    message: format!("Failed to send shutdown command: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }

        Ok(())
    }

    fn navigate(&mut self, signal: NavigationSignal) {
        let outcome = self.recorder.navigate(signal);
        self.settle(outcome.map(Some), "Playback failed");
    }

    /// Reflect the result of a user action in the tray.
    fn settle(&mut self, result: AppResult<Option<PlayOutcome>>, context: &str) {
        self.refresh_tray();

        match result {
            Ok(Some(PlayOutcome::Started(_))) => {
                self.waveform = self.recorder.playback_waveform().map(|w| (w, 0));
                if let Some((waveform, playhead)) = &self.waveform {
                    self.send_tray(TrayCommand::SetImage(waveform.render(*playhead)));
                }
            }
            Ok(Some(PlayOutcome::NothingToPlay)) => self.show_message(FILE_NOT_FOUND.to_string()),
            Ok(_) => {}
            Err(e) => {
                error!(error = ?e, "{}", context);
                self.show_message(format!("{}: {}", context, e));
            }
        }
    }

    fn show_notices(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::RecordingSaved(entry) => {
                    debug!(file_name = %entry.file_name, "Recording catalogued");
                    self.refresh_tray();
                }
                Notice::RecordingFailed(reason) => {
                    self.refresh_tray();
                    self.show_message(format!("Recording failed: {}", reason));
                }
                Notice::PlaybackFinished(reason) => {
                    self.refresh_tray();
                    if let CompletionReason::Failed(reason) = reason {
                        self.show_message(format!("Playback failed: {}", reason));
                    }
                }
                Notice::Progress(progress) => {
                    let file_name = self
                        .recorder
                        .current()
                        .map_or(String::new(), |c| c.file_name.clone());
                    self.show_message(progress_tooltip(
                        &file_name,
                        progress.elapsed,
                        progress.duration,
                    ));

                    let moved = self.waveform.as_mut().and_then(|(waveform, drawn)| {
                        let column = waveform.playhead_column(progress.elapsed, progress.duration);
                        (column != *drawn).then(|| {
                            *drawn = column;
                            waveform.render(column)
                        })
                    });
                    if let Some(image) = moved {
                        self.send_tray(TrayCommand::SetImage(image));
                    }
                }
            }
        }
    }

    /// Derive the tray icon from the session; resets the tooltip on change.
    fn refresh_tray(&mut self) {
        let state = if self.recorder.is_recording() {
            TrayIconState::Recording
        } else if self.recorder.is_playing() {
            TrayIconState::Playing
        } else {
            TrayIconState::Idle
        };

        if state != self.tray_state {
            self.tray_state = state;
            self.last_tooltip = None;
            if state != TrayIconState::Playing {
                self.waveform = None;
            }
            self.send_tray(TrayCommand::SetState(state));
        }
    }

    fn show_message(&mut self, tooltip: String) {
        if self.last_tooltip.as_deref() == Some(tooltip.as_str()) {
            return;
        }
        self.last_tooltip = Some(tooltip.clone());
        self.send_tray(TrayCommand::SetTooltip(tooltip));
    }

    fn send_tray(&self, command: TrayCommand) {
        if self.tray_proxy.send_event(command).is_err() {
            debug!("Tray event loop closed");
        }
    }
}
