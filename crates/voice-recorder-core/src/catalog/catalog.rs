//! Flat, persisted index of recordings.
//!
//! The index is a TOML file next to the recordings. On open it is reconciled
//! with the directory: entries whose file disappeared are dropped, and
//! `Recording_*.wav` files missing from the index are added.

use crate::{
    AudioError, CoreResult,
    catalog::{
        FILE_EXTENSION, FILE_PREFIX, INDEX_FILE_NAME, RecordingEntry, entry::is_legacy_name,
        file_name_for, parse_timestamp,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// How many consecutive seconds `allocate` tries before giving up.
const MAX_NAME_ATTEMPTS: i64 = 60;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogIndex {
    #[serde(default)]
    recordings: Vec<RecordingEntry>,
}

#[derive(Serialize)]
struct CatalogIndexRef<'a> {
    recordings: &'a [RecordingEntry],
}

/// Ordered collection of known recordings.
///
/// Entries are kept in chronological order: `next` moves to a later
/// recording and `previous` to an earlier one.
#[derive(Debug)]
pub struct RecordingCatalog {
    dir: PathBuf,
    index_path: PathBuf,
    entries: Vec<RecordingEntry>,
}

impl RecordingCatalog {
    /// Open (or create) the catalog stored in `dir`.
    #[track_caller]
    #[instrument]
    pub fn open(dir: &Path) -> CoreResult<Self> {
        fs::create_dir_all(dir).map_err(|e| AudioError::CatalogError {
            reason: format!("Failed to create recordings directory {:?}: {}", dir, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let index_path = dir.join(INDEX_FILE_NAME);

        let indexed = if index_path.exists() {
            let contents =
                fs::read_to_string(&index_path).map_err(|e| AudioError::CatalogError {
                    reason: format!("Failed to read catalog index: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let index: CatalogIndex =
                toml::from_str(&contents).map_err(|e| AudioError::CatalogError {
                    reason: format!("Failed to parse catalog index: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            index.recordings
        } else {
            Vec::new()
        };

        let indexed_count = indexed.len();
        let mut entries: Vec<RecordingEntry> = indexed
            .into_iter()
            .filter(|entry| {
                let present = entry.path.exists();
                if !present {
                    warn!(path = ?entry.path, "Recording missing on disk, dropping from catalog");
                }
                present
            })
            .collect();
        let mut changed = entries.len() != indexed_count;

        for found in scan_directory(dir)? {
            if !entries.iter().any(|e| e.file_name == found.file_name) {
                debug!(file_name = %found.file_name, "Adding unindexed recording");
                entries.push(found);
                changed = true;
            }
        }

        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        let catalog = Self {
            dir: dir.to_path_buf(),
            index_path,
            entries,
        };

        if changed || !catalog.index_path.exists() {
            catalog.save()?;
        }

        info!(
            dir = ?catalog.dir,
            recordings = catalog.entries.len(),
            "Recording catalog opened"
        );

        Ok(catalog)
    }

    /// Reserve a fresh, unused entry for a recording starting at `now`.
    ///
    /// If the name for `now` is taken, later seconds are tried so names stay
    /// unique and in chronological order. The entry is not inserted.
    #[track_caller]
    pub fn allocate(&self, now: NaiveDateTime) -> CoreResult<RecordingEntry> {
        for offset in 0..MAX_NAME_ATTEMPTS {
            let created_at = now + TimeDelta::seconds(offset);
            let file_name = file_name_for(created_at);
            let path = self.dir.join(&file_name);

            if !path.exists() && !self.contains(&file_name) {
                return Ok(RecordingEntry {
                    file_name,
                    path,
                    created_at,
                });
            }
        }

        Err(AudioError::CatalogError {
            reason: format!("No free recording name near {}", now),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Add `entry` in chronological position and persist the index.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn insert(&mut self, entry: RecordingEntry) -> CoreResult<()> {
        if self.contains(&entry.file_name) {
            return Err(AudioError::CatalogError {
                reason: format!("Recording {} already catalogued", entry.file_name),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let position = self.entries.partition_point(|e| {
            (e.created_at, e.file_name.as_str()) <= (entry.created_at, entry.file_name.as_str())
        });
        self.entries.insert(position, entry);

        self.save()
    }

    /// File-system location of `entry`.
    pub fn path_of<'a>(&self, entry: &'a RecordingEntry) -> &'a Path {
        &entry.path
    }

    /// The latest recording.
    pub fn most_recent(&self) -> Option<&RecordingEntry> {
        self.entries.last()
    }

    /// The recording made just before `entry`.
    pub fn previous(&self, entry: &RecordingEntry) -> Option<&RecordingEntry> {
        let index = self.position(entry)?;
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// The recording made just after `entry`.
    pub fn next(&self, entry: &RecordingEntry) -> Option<&RecordingEntry> {
        let index = self.position(entry)?;
        self.entries.get(index + 1)
    }

    /// Look up an entry by file name.
    pub fn get(&self, file_name: &str) -> Option<&RecordingEntry> {
        self.entries.iter().find(|e| e.file_name == file_name)
    }

    /// True if a recording with `file_name` is catalogued.
    pub fn contains(&self, file_name: &str) -> bool {
        self.get(file_name).is_some()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[RecordingEntry] {
        &self.entries
    }

    /// Number of catalogued recordings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no recordings are catalogued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directory holding the recordings and the index.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn position(&self, entry: &RecordingEntry) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.file_name == entry.file_name)
    }

    /// Persist the index using a temp file and rename.
    #[track_caller]
    fn save(&self) -> CoreResult<()> {
        let contents = toml::to_string_pretty(&CatalogIndexRef {
            recordings: &self.entries,
        })
        .map_err(|e| AudioError::CatalogError {
            reason: format!("Failed to serialize catalog: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = self.index_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AudioError::CatalogError {
            reason: format!("Failed to create temp catalog file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .and_then(|()| temp_file.sync_all())
            .map_err(|e| AudioError::CatalogError {
                reason: format!("Failed to write temp catalog file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        fs::rename(&temp_path, &self.index_path).map_err(|e| AudioError::CatalogError {
            reason: format!("Failed to replace catalog index: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(index_path = ?self.index_path, recordings = self.entries.len(), "Catalog saved");

        Ok(())
    }
}

/// Entries for every generated recording file in `dir`.
#[track_caller]
fn scan_directory(dir: &Path) -> CoreResult<Vec<RecordingEntry>> {
    let read_dir = fs::read_dir(dir).map_err(|e| AudioError::CatalogError {
        reason: format!("Failed to list {:?}: {}", dir, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut found = Vec::new();

    for dir_entry in read_dir.flatten() {
        let Ok(file_name) = dir_entry.file_name().into_string() else {
            continue;
        };

        if !file_name.starts_with(FILE_PREFIX) || !file_name.ends_with(FILE_EXTENSION) {
            continue;
        }

        let path = dir_entry.path();
        let modified = dir_entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(|t| DateTime::<Local>::from(t).naive_local());

        let created_at = if is_legacy_name(&file_name) {
            modified.or_else(|| parse_timestamp(&file_name))
        } else {
            parse_timestamp(&file_name).or(modified)
        };

        let Some(created_at) = created_at else {
            warn!(file_name = %file_name, "Skipping recording with unreadable timestamp");
            continue;
        };

        found.push(RecordingEntry {
            file_name,
            path,
            created_at,
        });
    }

    Ok(found)
}
