//! System tray icon with state-based updates.
//!
//! Shows one icon per session state (Idle, Recording, Playing) and a menu to
//! record, play and browse recordings.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use error_location::ErrorLocation;
use image::RgbaImage;
use tracing::{info, instrument};
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuId, MenuItem, PredefinedMenuItem},
};

/// Menu item ids the application reacts to.
#[derive(Debug, Clone)]
pub struct TrayMenuIds {
    /// Start a new recording.
    pub record: MenuId,
    /// Stop the current recording.
    pub stop_recording: MenuId,
    /// Play the current recording, or stop playback.
    pub toggle_playback: MenuId,
    /// Play the previous recording.
    pub previous: MenuId,
    /// Play the next recording.
    pub next: MenuId,
    /// Quit.
    pub exit: MenuId,
}

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    record_item: MenuItem,
    stop_recording_item: MenuItem,
    menu_ids: TrayMenuIds,
}

impl TrayManager {
    /// Create the tray icon in the idle state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let record_item = MenuItem::new("Record", true, None);
        let stop_recording_item = MenuItem::new("Stop Recording", false, None);
        let toggle_playback_item = MenuItem::new("Play / Stop", true, None);
        let previous_item = MenuItem::new("Previous", true, None);
        let next_item = MenuItem::new("Next", true, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let menu_ids = TrayMenuIds {
            record: record_item.id().clone(),
            stop_recording: stop_recording_item.id().clone(),
            toggle_playback: toggle_playback_item.id().clone(),
            previous: previous_item.id().clone(),
            next: next_item.id().clone(),
            exit: exit_item.id().clone(),
        };

        menu.append_items(&[
            &record_item,
            &stop_recording_item,
            &PredefinedMenuItem::separator(),
            &toggle_playback_item,
            &previous_item,
            &next_item,
            &PredefinedMenuItem::separator(),
            &exit_item,
        ])
        .map_err(|e| AppError::TrayError {
            reason: format!("Failed to build tray menu: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(TrayIconState::Idle.tooltip())
            .with_menu(Box::new(menu))
            .with_icon(Self::load_icon(TrayIconState::Idle)?)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            record_item,
            stop_recording_item,
            menu_ids,
        })
    }

    /// Switch icon, default tooltip, and which recording item is enabled.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn update_state(&mut self, state: TrayIconState) -> AppResult<()> {
        self.tray_icon
            .set_icon(Some(Self::load_icon(state)?))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let recording = state == TrayIconState::Recording;
        self.record_item.set_enabled(!recording);
        self.stop_recording_item.set_enabled(recording);

        self.set_tooltip(state.tooltip())
    }

    /// Show `image` as the icon without changing the state-driven menu.
    #[track_caller]
    pub fn set_image(&mut self, image: RgbaImage) -> AppResult<()> {
        self.tray_icon
            .set_icon(Some(Self::icon_from(image)?))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Replace the tooltip text.
    #[track_caller]
    pub fn set_tooltip(&mut self, tooltip: &str) -> AppResult<()> {
        self.tray_icon
            .set_tooltip(Some(tooltip))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Ids of the menu items.
    pub fn menu_ids(&self) -> &TrayMenuIds {
        &self.menu_ids
    }

    /// Build the icon for `state` from generated RGBA pixels.
    #[track_caller]
    fn load_icon(state: TrayIconState) -> AppResult<Icon> {
        Self::icon_from(state.render())
    }

    #[track_caller]
    fn icon_from(rgba: RgbaImage) -> AppResult<Icon> {
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
