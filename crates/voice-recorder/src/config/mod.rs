mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod hotkey_config;
mod playback_config;
mod storage_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config, hotkey_config::HotkeyConfig,
    playback_config::PlaybackConfig, storage_config::StorageConfig,
};

use voice_recorder_core::{
    DEFAULT_CHANNELS, DEFAULT_QUEUE_CAPACITY, DEFAULT_SAMPLE_RATE, DEFAULT_STOP_TIMEOUT,
    DEFAULT_TICK_INTERVAL,
};

pub(crate) const DEFAULT_PREVIOUS_HOTKEY: &str = "PageUp";
pub(crate) const DEFAULT_NEXT_HOTKEY: &str = "PageDown";

pub(crate) fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

pub(crate) fn default_channels() -> u16 {
    DEFAULT_CHANNELS
}

pub(crate) fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

pub(crate) fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT.as_millis() as u64
}

pub(crate) fn default_previous_hotkey() -> String {
    DEFAULT_PREVIOUS_HOTKEY.to_string()
}

pub(crate) fn default_next_hotkey() -> String {
    DEFAULT_NEXT_HOTKEY.to_string()
}
