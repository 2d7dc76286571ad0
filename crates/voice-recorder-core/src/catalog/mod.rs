#[allow(clippy::module_inception)]
mod catalog;
mod entry;

pub use {
    catalog::RecordingCatalog,
    entry::{RecordingEntry, file_name_for, parse_timestamp},
};

/// Prefix shared by every generated recording file name.
pub(crate) const FILE_PREFIX: &str = "Recording_";

/// Extension of generated recording files.
pub(crate) const FILE_EXTENSION: &str = ".wav";

/// Timestamp layout embedded in file names (24-hour clock).
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Name of the persisted index inside the recordings directory.
pub(crate) const INDEX_FILE_NAME: &str = "recordings.toml";
