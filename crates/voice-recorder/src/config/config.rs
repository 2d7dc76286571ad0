//! Configuration management for voice-recorder.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, HotkeyConfig, PlaybackConfig, StorageConfig},
    hotkey_listener::parse_hotkey,
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use voice_recorder_core::{SessionSettings, StreamFormat};

const CONFIG_FILE_NAME: &str = "config.toml";
const RECORDINGS_DIR_NAME: &str = "recordings";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Recording format and buffering.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Playback progress and stop behaviour.
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Navigation hotkeys.
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
    /// Recording storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating the
    /// default file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load and validate configuration from `path`.
    ///
    /// Missing sections and keys fall back to their defaults.
    #[track_caller]
    #[instrument]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Reject values the audio engine or hotkey registration cannot use.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be greater than zero".to_string()));
        }
        if self.audio.channels == 0 {
            return Err(invalid("audio.channels must be greater than zero".to_string()));
        }
        if self.audio.queue_capacity == 0 {
            return Err(invalid("audio.queue_capacity must be greater than zero".to_string()));
        }
        if self.playback.tick_interval_ms == 0 {
            return Err(invalid("playback.tick_interval_ms must be greater than zero".to_string()));
        }
        if self.playback.stop_timeout_ms == 0 {
            return Err(invalid("playback.stop_timeout_ms must be greater than zero".to_string()));
        }

        let previous = parse_hotkey(&self.hotkeys.previous)?;
        let next = parse_hotkey(&self.hotkeys.next)?;
        if previous.id() == next.id() {
            return Err(invalid(format!(
                "hotkeys.previous and hotkeys.next are both {:?}",
                self.hotkeys.previous
            )));
        }

        Ok(())
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Engine settings derived from the `[audio]` and `[playback]` sections.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            format: StreamFormat {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
            },
            tick_interval: Duration::from_millis(self.playback.tick_interval_ms),
            stop_timeout: Duration::from_millis(self.playback.stop_timeout_ms),
            queue_capacity: self.audio.queue_capacity,
        }
    }

    /// Configured recordings directory, or `<data dir>/recordings`.
    #[track_caller]
    pub fn recordings_dir(&self) -> AppResult<PathBuf> {
        match &self.storage.recordings_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join(RECORDINGS_DIR_NAME)),
        }
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "voice-recorder", "Voice-Recorder").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}
