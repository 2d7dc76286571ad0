use crate::config::{default_next_hotkey, default_previous_hotkey};

use serde::{Deserialize, Serialize};

/// Global navigation hotkeys, in `global-hotkey` notation (e.g. `"shift+PageUp"`).
///
/// Registration is exclusive: while the recorder runs, other applications no
/// longer receive these keys. Bind with a modifier such as `"shift+PageUp"`
/// to keep plain PageUp/PageDown for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Plays the recording made before the current one.
    #[serde(default = "default_previous_hotkey")]
    pub previous: String,
    /// Plays the recording made after the current one.
    #[serde(default = "default_next_hotkey")]
    pub next: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            previous: default_previous_hotkey(),
            next: default_next_hotkey(),
        }
    }
}
