use crate::TrayIconState;

use image::RgbaImage;

/// Commands sent from the async runtime to the main UI thread.
///
/// The main thread owns `TrayManager` (because `TrayIcon` is `!Send`),
/// so all tray mutations and process lifecycle events flow through this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayCommand {
    /// Switch icon and default tooltip.
    SetState(TrayIconState),
    /// Replace the icon with a rendered image, e.g. the playback waveform.
    SetImage(RgbaImage),
    /// Replace the tooltip text, e.g. with playback progress or an error.
    SetTooltip(String),
    /// Exit the event loop. Sent once the app loop has stopped the session.
    Shutdown,
}
