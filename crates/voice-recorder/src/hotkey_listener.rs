//! Global navigation hotkeys.
//!
//! Registers the previous/next hotkeys on the UI thread and forwards their
//! presses to the application as [`NavigationSignal`]s. What a signal does is
//! decided by the application, not here.

use crate::{AppCommand, AppError, AppResult, NavigationSignal, config::HotkeyConfig};

use std::{panic::Location, str::FromStr, time::Duration};

use error_location::ErrorLocation;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState, hotkey::HotKey};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Parse a hotkey in `global-hotkey` notation, e.g. `"PageUp"` or `"ctrl+alt+KeyN"`.
#[track_caller]
pub(crate) fn parse_hotkey(binding: &str) -> AppResult<HotKey> {
    HotKey::from_str(binding).map_err(|e| AppError::ConfigError {
        reason: format!("Invalid hotkey {:?}: {}", binding, e),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Registered hotkey ids for the two navigation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBindings {
    previous: u32,
    next: u32,
}

impl HotkeyBindings {
    pub(crate) fn from_hotkeys(previous: &HotKey, next: &HotKey) -> Self {
        Self {
            previous: previous.id(),
            next: next.id(),
        }
    }

    /// Signal raised by a hotkey event, if it is a press of one of ours.
    pub(crate) fn signal_for(&self, id: u32, state: HotKeyState) -> Option<NavigationSignal> {
        if state != HotKeyState::Pressed {
            return None;
        }

        if id == self.previous {
            Some(NavigationSignal::Previous)
        } else if id == self.next {
            Some(NavigationSignal::Next)
        } else {
            None
        }
    }
}

/// OS registration of the navigation hotkeys.
///
/// Must be created and dropped on the thread running the UI event loop so the
/// platform delivers hotkey messages. Dropping it unregisters both hotkeys.
pub struct HotkeyRegistration {
    manager: GlobalHotKeyManager,
    hotkeys: [HotKey; 2],
    active: bool,
}

impl HotkeyRegistration {
    /// Register the configured previous/next hotkeys.
    #[track_caller]
    #[instrument]
    pub fn register(config: &HotkeyConfig) -> AppResult<(Self, HotkeyBindings)> {
        let previous = parse_hotkey(&config.previous)?;
        let next = parse_hotkey(&config.next)?;

        let manager =
            GlobalHotKeyManager::new().map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to create manager: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        manager
            .register(previous)
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to register {}: {}", config.previous, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if let Err(e) = manager.register(next) {
            if let Err(undo) = manager.unregister(previous) {
                warn!(error = %undo, "Failed to roll back previous hotkey");
            }
            return Err(AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to register {}: {}", config.next, e),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(
            previous = %config.previous,
            next = %config.next,
            "Navigation hotkeys registered"
        );

        let bindings = HotkeyBindings::from_hotkeys(&previous, &next);

        Ok((
            Self {
                manager,
                hotkeys: [previous, next],
                active: true,
            },
            bindings,
        ))
    }

    /// Unregister both hotkeys. Safe to call more than once.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        match self.manager.unregister_all(&self.hotkeys) {
            Ok(()) => info!("Navigation hotkeys unregistered"),
            Err(e) => error!(error = %e, "Failed to unregister navigation hotkeys"),
        }
    }
}

impl Drop for HotkeyRegistration {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forwards navigation hotkey presses to the application command channel.
pub struct HotkeyListener {
    bindings: HotkeyBindings,
    command_tx: mpsc::Sender<AppCommand>,
}

impl HotkeyListener {
    /// Create a listener for previously registered hotkeys.
    ///
    /// This struct is `Send` and can live on any thread; it only listens on
    /// the global [`GlobalHotKeyEvent`] channel.
    pub fn new(bindings: HotkeyBindings, command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self {
            bindings,
            command_tx,
        }
    }

    /// Run until a shutdown signal is received.
    #[instrument(skip(self))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let receiver = GlobalHotKeyEvent::receiver().clone();
        let (event_tx, mut event_rx) = mpsc::channel(32);

        // GlobalHotKeyEvent::receiver() is a crossbeam_channel::Receiver with
        // a blocking recv(), so one blocking task forwards without polling.
        // Dropping event_rx makes the next blocking_send() fail and ends it.
        let handle = tokio::task::spawn_blocking(move || {
            while let Ok(event) = receiver.recv() {
                if event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Hotkey listener shutting down");
                    break;
                }
                Some(event) = event_rx.recv() => {
                    if let Some(signal) = self.bindings.signal_for(event.id, event.state) {
                        self.forward(signal).await?;
                    }
                }
            }
        }

        drop(event_rx);

        // The blocking task may sit in recv() until the next hotkey event;
        // the runtime cleans it up on exit.
        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => debug!("Hotkey event forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Hotkey event forwarder task panicked"),
            Err(_) => debug!(
                "Hotkey event forwarder did not stop within timeout, \
                   will be cleaned up on exit"
            ),
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn forward(&self, signal: NavigationSignal) -> AppResult<()> {
        self.command_tx
            .send(AppCommand::Navigate(signal))
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send {:?}: {}", signal, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(signal = ?signal, "Navigation hotkey forwarded");

        Ok(())
    }
}
