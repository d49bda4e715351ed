//! JSON metadata: manifest, errors, overlap registry

use crate::error::{AggregateError, Result};
use crate::types::{DatasetKind, ProcessedTrack, Split, TrackFlag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Manifest record for one successfully processed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source_dataset: DatasetKind,
    pub original_track_name: String,
    pub artist: String,
    pub title: String,
    pub split: Split,
    pub available_stems: Vec<String>,
    pub profile: String,
    pub license: String,
    pub has_bleed: bool,
    pub musdb18hq_4stem_only: bool,
    pub flags: Vec<TrackFlag>,
}

impl ManifestEntry {
    /// Composite key used in `manifest.json`
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.source_dataset, self.split, self.original_track_name
        )
    }
}

impl From<ProcessedTrack> for ManifestEntry {
    fn from(processed: ProcessedTrack) -> Self {
        Self {
            license: processed.source_dataset.license().to_string(),
            source_dataset: processed.source_dataset,
            original_track_name: processed.original_track_name,
            artist: processed.artist,
            title: processed.title,
            split: processed.split,
            available_stems: processed.written_stems,
            profile: processed.profile,
            has_bleed: processed.has_bleed,
            musdb18hq_4stem_only: processed.four_stem_only,
            flags: processed.flags.into_iter().collect(),
        }
    }
}

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Acquire,
    Process,
    Validate,
}

/// One failed track (or corpus, for acquisition errors)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub track: String,
    pub dataset: String,
    pub error: String,
    pub stage: ErrorStage,
    pub skipped: bool,
}

impl ErrorEntry {
    pub fn new(
        track: impl Into<String>,
        dataset: impl Into<String>,
        error: impl ToString,
        stage: ErrorStage,
    ) -> Self {
        Self {
            track: track.into(),
            dataset: dataset.into(),
            error: error.to_string(),
            stage,
            skipped: true,
        }
    }
}

/// `overlap_registry.json` contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRegistry {
    pub description: String,
    pub reason: String,
    pub skipped_count: usize,
    pub skipped_tracks: Vec<String>,
}

impl OverlapRegistry {
    pub fn new(skipped_tracks: impl IntoIterator<Item = String>) -> Self {
        let mut skipped_tracks: Vec<String> = skipped_tracks.into_iter().collect();
        skipped_tracks.sort();
        Self {
            description: "MUSDB18-HQ tracks skipped due to cross-dataset overlap with MedleyDB"
                .to_string(),
            reason: "MedleyDB preferred (more granular stems)".to_string(),
            skipped_count: skipped_tracks.len(),
            skipped_tracks,
        }
    }
}

/// Serialize `value` as pretty JSON to `path`
///
/// Writes to a temp file next to the target and renames it into place, so an
/// interrupted write never leaves a truncated file behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AggregateError::output_error(parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");
    let file = File::create(&temp_path).map_err(|e| AggregateError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(std::io::Error::from)
        .and_then(|()| writer.flush())
        .map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            AggregateError::OutputError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
    drop(writer);

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AggregateError::OutputError {
            path: path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    Ok(())
}

/// Write `manifest.json`, keyed and sorted by [`ManifestEntry::key`]
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let manifest: BTreeMap<String, &ManifestEntry> =
        entries.iter().map(|e| (e.key(), e)).collect();
    write_json_atomic(path, &manifest)?;
    info!("Wrote {} manifest entries to {}", manifest.len(), path.display());
    Ok(())
}

/// Read a previous run's `manifest.json`
///
/// A missing or unreadable manifest yields an empty map; entries for resumed
/// tracks are then rebuilt from the files on disk.
pub fn load_manifest(path: &Path) -> BTreeMap<String, ManifestEntry> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    match serde_json::from_str(&text) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

/// Write `errors.json`, replacing any log from a previous run
pub fn write_errors(path: &Path, errors: &[ErrorEntry]) -> Result<()> {
    write_json_atomic(path, errors)
}

/// Write `overlap_registry.json`
pub fn write_overlap_registry(path: &Path, registry: &OverlapRegistry) -> Result<()> {
    write_json_atomic(path, registry)
}
