use std::time::Duration;

use image::{Rgba, RgbaImage};

/// Edge length of the generated tray icons, in pixels.
pub(crate) const ICON_SIZE: u32 = 32;

/// Tray icon states corresponding to the audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Nothing recording or playing.
    Idle,
    /// Recording from the microphone.
    Recording,
    /// Playing a recording.
    Playing,
}

impl TrayIconState {
    /// Default tooltip for the state.
    pub fn tooltip(self) -> &'static str {
        match self {
            TrayIconState::Idle => "Voice Recorder - Ready",
            TrayIconState::Recording => "Voice Recorder - Recording...",
            TrayIconState::Playing => "Voice Recorder - Playing",
        }
    }

    fn color(self) -> Rgba<u8> {
        match self {
            TrayIconState::Idle => Rgba([128, 128, 128, 255]),
            TrayIconState::Recording => Rgba([220, 40, 40, 255]),
            TrayIconState::Playing => Rgba([40, 170, 70, 255]),
        }
    }

    /// A filled disc in the state's color on a transparent square.
    pub(crate) fn render(self) -> RgbaImage {
        let center = (ICON_SIZE as f32 - 1.0) / 2.0;
        let radius = ICON_SIZE as f32 / 2.0 - 2.0;
        let color = self.color();

        RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            if dx * dx + dy * dy <= radius * radius {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

/// `mm:ss`, with minutes allowed past 59.
pub(crate) fn format_clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Tooltip shown while a recording plays.
pub(crate) fn progress_tooltip(file_name: &str, elapsed: Duration, duration: Duration) -> String {
    format!(
        "{} {} / {}",
        file_name,
        format_clock(elapsed),
        format_clock(duration)
    )
}
