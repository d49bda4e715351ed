//! Corpus adapters
//!
//! Each supported corpus implements [`DatasetAdapter`]: validate the on-disk
//! layout, discover tracks in a stable order, and turn one track into summed
//! category stems under the output root.

pub mod medleydb;
pub mod mixer;
pub mod moisesdb;
pub mod musdb18hq;

pub use medleydb::MedleydbAdapter;
pub use mixer::StemMixer;
pub use moisesdb::MoisesdbAdapter;
pub use musdb18hq::Musdb18hqAdapter;

use crate::config::Settings;
use crate::error::Result;
use crate::mapping::{MedleyOverrides, ProfileKind};
use crate::naming::sanitize_filename;
use crate::types::{DatasetKind, ProcessedTrack, Track};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output folder for full mixtures
pub const MIXTURE_DIR: &str = "mixture";

/// Trait for corpus adapters
pub trait DatasetAdapter {
    /// Which corpus this adapter reads
    fn kind(&self) -> DatasetKind;

    /// Fail with a layout error if the root does not look like this corpus
    fn validate_layout(&self) -> Result<()>;

    /// List tracks in a stable order with 1-based indices assigned
    fn discover(&self) -> Result<Vec<Track>>;

    /// Write the track's category stems and report what was written
    fn process(&self, track: &Track, options: &ProcessOptions) -> Result<ProcessedTrack>;
}

/// Run-wide options every adapter needs to write a track
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub profile: ProfileKind,
    pub output: PathBuf,
    pub group_by_dataset: bool,
    pub include_mixtures: bool,
}

impl ProcessOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            profile: settings.profile,
            output: settings.output.clone(),
            group_by_dataset: settings.group_by_dataset,
            include_mixtures: settings.include_mixtures,
        }
    }

    /// `<output>/<category>[/<dataset>]/<filename_base>.wav`
    pub fn output_path(&self, category: &str, dataset: DatasetKind, filename_base: &str) -> PathBuf {
        let mut dir = self.output.join(category);
        if self.group_by_dataset {
            dir.push(dataset.as_str());
        }
        dir.join(format!("{}.wav", filename_base))
    }

    /// Every stem path the track could produce under the current profile
    pub fn expected_outputs(&self, track: &Track) -> Vec<PathBuf> {
        let base = sanitize_filename(
            track.source_dataset,
            track.split,
            track.index,
            &track.artist,
            &track.title,
        );
        self.profile
            .profile()
            .stems
            .iter()
            .map(|category| self.output_path(category, track.source_dataset, &base))
            .collect()
    }
}

/// Serializable recipe for rebuilding an adapter on any thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub kind: DatasetKind,
    pub root: PathBuf,
    /// MedleyDB overrides file, ignored for other corpora
    pub overrides: Option<PathBuf>,
}

impl DatasetSource {
    pub fn new(kind: DatasetKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
            overrides: None,
        }
    }

    /// Build the adapter for this corpus
    pub fn open(&self) -> Result<Box<dyn DatasetAdapter>> {
        if let Some(shared) = self.open_shared()? {
            let adapter: Box<dyn DatasetAdapter> = shared;
            return Ok(adapter);
        }
        Ok(Box::new(MoisesdbAdapter::new(&self.root)))
    }

    /// Build the adapter if it may be used from pool worker threads
    ///
    /// Returns `None` for corpora whose adapter must stay on one thread.
    pub fn open_shared(&self) -> Result<Option<Box<dyn DatasetAdapter + Send + Sync>>> {
        Ok(match self.kind {
            DatasetKind::Musdb18hq => Some(Box::new(Musdb18hqAdapter::new(&self.root))),
            DatasetKind::Medleydb => {
                let overrides = match &self.overrides {
                    Some(path) => MedleyOverrides::load(path)?,
                    None => MedleyOverrides::default(),
                };
                Some(Box::new(MedleydbAdapter::with_overrides(&self.root, overrides)))
            }
            DatasetKind::Moisesdb => None,
        })
    }
}

/// Immediate subdirectories of `dir`, sorted by name
///
/// Hidden entries (including macOS `._` resource forks) are skipped.
pub(crate) fn list_subdirs(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect()
}

/// Assign 1-based indices in discovery order
pub(crate) fn assign_indices(tracks: &mut [Track]) {
    for (i, track) in tracks.iter_mut().enumerate() {
        track.index = i as u32 + 1;
    }
}
