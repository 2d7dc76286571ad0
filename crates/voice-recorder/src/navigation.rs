//! Hotkey navigation over the recording catalog.

use voice_recorder_core::{RecordingCatalog, RecordingEntry};

/// Discrete navigation request raised by a hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSignal {
    /// Move to the recording made before the current one.
    Previous,
    /// Move to the recording made after the current one.
    Next,
}

/// The entry a navigation signal selects, if any.
///
/// Without a current entry both signals select the most recent recording.
/// At either end of the catalog, or when it is empty, nothing is selected.
pub(crate) fn navigate<'a>(
    catalog: &'a RecordingCatalog,
    current: Option<&RecordingEntry>,
    signal: NavigationSignal,
) -> Option<&'a RecordingEntry> {
    let Some(current) = current.filter(|c| catalog.contains(&c.file_name)) else {
        return catalog.most_recent();
    };

    match signal {
        NavigationSignal::Previous => catalog.previous(current),
        NavigationSignal::Next => catalog.next(current),
    }
}
