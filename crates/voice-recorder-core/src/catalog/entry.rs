use crate::catalog::{FILE_EXTENSION, FILE_PREFIX, TIMESTAMP_FORMAT};

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One recording known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    /// Unique generated file name, e.g. `Recording_2026-10-19-15-04-05.wav`.
    pub file_name: String,
    /// Absolute location of the WAV file.
    pub path: PathBuf,
    /// Local wall-clock creation time.
    pub created_at: NaiveDateTime,
}

/// Generated file name for a recording started at `timestamp`.
///
/// Hours use the 24-hour clock so lexical order matches chronological order.
pub fn file_name_for(timestamp: NaiveDateTime) -> String {
    format!(
        "{}{}{}",
        FILE_PREFIX,
        timestamp.format(TIMESTAMP_FORMAT),
        FILE_EXTENSION
    )
}

/// Timestamp embedded in a generated file name.
///
/// Accepts the canonical form and the older `Recording_<...>_.wav` form with a
/// trailing underscore. Older names used a 12-hour hour field, so their parsed
/// time is only accurate to within twelve hours; callers that need ordering
/// should prefer the file's modification time for those.
pub fn parse_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?;
    let stem = stem.strip_suffix('_').unwrap_or(stem);
    NaiveDateTime::parse_from_str(stem, TIMESTAMP_FORMAT).ok()
}

/// True for names written before hours switched to the 24-hour clock.
pub(crate) fn is_legacy_name(file_name: &str) -> bool {
    file_name.ends_with(&format!("_{}", FILE_EXTENSION))
}
