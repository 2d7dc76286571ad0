use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where recordings live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Recordings directory (None = platform data directory).
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}
