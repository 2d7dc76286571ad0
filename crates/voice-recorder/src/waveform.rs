//! Downsampled waveform of the recording being played, drawn as the tray icon.

use crate::tray_icon_state::ICON_SIZE;

use std::time::Duration;

use image::{Rgba, RgbaImage};
use voice_recorder_core::LoadedAudio;

const PLAYED: Rgba<u8> = Rgba([40, 170, 70, 255]);
const UNPLAYED: Rgba<u8> = Rgba([40, 170, 70, 110]);
const PLAYHEAD: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BACKGROUND: Rgba<u8> = Rgba([20, 20, 20, 200]);

/// Peak level per icon column, normalized so the loudest column is 1.0.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Waveform {
    peaks: Vec<f32>,
}

impl Waveform {
    /// Waveform of decoded audio, one peak per icon column.
    pub(crate) fn from_audio(audio: &LoadedAudio) -> Self {
        Self::from_samples(
            audio.samples(),
            usize::from(audio.format().channels),
            ICON_SIZE as usize,
        )
    }

    /// Split interleaved `samples` into `columns` equal spans of frames and
    /// keep the absolute peak of each.
    pub(crate) fn from_samples(samples: &[f32], channels: usize, columns: usize) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;

        let mut peaks: Vec<f32> = (0..columns)
            .map(|column| {
                let first = column * frames / columns;
                let last = ((column + 1) * frames / columns).max(first);
                samples[first * channels..last * channels]
                    .iter()
                    .fold(0.0f32, |peak, s| peak.max(s.abs()))
            })
            .collect();

        let loudest = peaks.iter().copied().fold(0.0f32, f32::max);
        if loudest > 0.0 {
            peaks.iter_mut().for_each(|p| *p /= loudest);
        }

        Self { peaks }
    }

    /// Normalized peaks, one per column.
    pub(crate) fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Column the playhead sits in after `elapsed` of `duration`.
    pub(crate) fn playhead_column(&self, elapsed: Duration, duration: Duration) -> usize {
        let last = self.peaks.len().saturating_sub(1);
        if duration.is_zero() {
            return last;
        }
        let fraction = (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
        ((fraction * self.peaks.len() as f64) as usize).min(last)
    }

    /// Bars centered vertically, brighter left of the playhead.
    pub(crate) fn render(&self, playhead: usize) -> RgbaImage {
        let height = ICON_SIZE as f32;
        let center = (height - 1.0) / 2.0;
        let max_half = height / 2.0 - 1.0;

        RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
            let column = x as usize;
            let Some(&peak) = self.peaks.get(column) else {
                return BACKGROUND;
            };
            if column == playhead {
                return PLAYHEAD;
            }

            let half = (peak * max_half).max(0.5);
            if (y as f32 - center).abs() <= half {
                if column < playhead { PLAYED } else { UNPLAYED }
            } else {
                BACKGROUND
            }
        })
    }
}
