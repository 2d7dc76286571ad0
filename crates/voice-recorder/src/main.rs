//! Voice Recorder: tray-based recorder with hotkey navigation between recordings.

mod app;
mod app_command;
mod config;
mod error;
mod hotkey_listener;
mod navigation;
mod recorder;
#[cfg(test)]
mod tests;
mod tray_command;
mod tray_icon_state;
mod tray_manager;
mod waveform;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    hotkey_listener::{HotkeyListener, HotkeyRegistration},
    navigation::NavigationSignal,
    recorder::{Notice, PlayOutcome, Recorder},
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::{TrayManager, TrayMenuIds},
};

use crate::config::Config;

use std::sync::Arc;

use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::error;
use tracing_subscriber::EnvFilter;
use voice_recorder_core::{CpalBackend, RecordingCatalog, SessionController};

const DEFAULT_LOG_FILTER: &str = "voice_recorder=debug,voice_recorder_core=debug";

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    // Lives in the closure for the app's lifetime; dropping it unregisters
    // the hotkeys.
    let mut hotkeys: Option<HotkeyRegistration> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(cmd) => {
                let result = match cmd {
                    TrayCommand::SetState(state) => tray_manager.update_state(state),
                    TrayCommand::SetImage(image) => tray_manager.set_image(image),
                    TrayCommand::SetTooltip(tooltip) => tray_manager.set_tooltip(&tooltip),
                    TrayCommand::Shutdown => {
                        if let Some(registration) = hotkeys.as_mut() {
                            registration.stop();
                        }
                        *control_flow = ControlFlow::ExitWithCode(0);
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    error!(error = ?e, "Failed to update tray icon");
                }
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let catalog = match config
                    .recordings_dir()
                    .and_then(|dir| RecordingCatalog::open(&dir).map_err(AppError::from))
                {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to open recording catalog: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let session =
                    SessionController::new(Arc::new(CpalBackend::new()), config.session_settings());

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                let (command_tx, command_rx) = mpsc::channel(32);
                let (shutdown_tx, shutdown_rx) = watch::channel(false);

                // Register hotkeys on the main thread: tao's event loop pumps
                // the messages needed for hotkey delivery on Windows.
                let (registration, bindings) = match HotkeyRegistration::register(&config.hotkeys)
                {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkeys: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkeys = Some(registration);

                let tray_proxy = tray_proxy.clone();
                let menu_ids = tray_manager.menu_ids().clone();

                // Spawn tokio runtime on separate thread.
                // TrayManager and the hotkey registration stay on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let listener = HotkeyListener::new(bindings, command_tx.clone());

                        let app = App::new(
                            Recorder::new(session, catalog),
                            tray_proxy,
                            menu_ids,
                            command_tx,
                            command_rx,
                            shutdown_tx,
                        );

                        tokio::join!(
                            async {
                                if let Err(e) = listener.run(shutdown_rx).await {
                                    error!(error = ?e, "Hotkey listener error");
                                }
                            },
                            async {
                                if let Err(e) = app.run().await {
                                    error!(error = ?e, "App error");
                                }
                            }
                        );
                    });
                });
            }
            _ => {}
        }
    });
}
