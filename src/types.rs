//! Core data types for mss-datasets
//!
//! These types represent the domain model and flow through the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Corpora and splits
// =============================================================================

/// The source corpora the pipeline knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Musdb18hq,
    Medleydb,
    Moisesdb,
}

impl DatasetKind {
    /// All corpora, in the order they are discovered
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Musdb18hq,
        DatasetKind::Medleydb,
        DatasetKind::Moisesdb,
    ];

    /// Identifier used in filenames, manifest keys and output folders
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Musdb18hq => "musdb18hq",
            DatasetKind::Medleydb => "medleydb",
            DatasetKind::Moisesdb => "moisesdb",
        }
    }

    /// Human-readable corpus name for log messages
    pub fn display_name(self) -> &'static str {
        match self {
            DatasetKind::Musdb18hq => "MUSDB18-HQ",
            DatasetKind::Medleydb => "MedleyDB",
            DatasetKind::Moisesdb => "MoisesDB",
        }
    }

    /// License string recorded in the manifest
    pub fn license(self) -> &'static str {
        match self {
            DatasetKind::Musdb18hq => "academic-use-only",
            DatasetKind::Medleydb => "CC BY-NC-SA 4.0",
            DatasetKind::Moisesdb => "non-commercial-research",
        }
    }

    /// Whether this corpus's adapter can be rebuilt on pool worker threads.
    ///
    /// The MoisesDB adapter keeps a single-threaded document cache and is
    /// always processed on the orchestrating thread.
    pub fn is_shareable(self) -> bool {
        !matches!(self, DatasetKind::Moisesdb)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Train/test/validation partition label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Val,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic annotations accumulated while discovering and processing a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackFlag {
    /// A stem explicitly labelled "Unlabeled" was routed to the catch-all
    Unlabeled,
    /// At least one output category is the sum of several source stems
    CompositeSum,
    /// An instrument label missing from the mapping table was routed to the catch-all
    UnknownLabel,
    /// A premixed "Main System" stem was excluded from every category
    Exclude,
}

// =============================================================================
// Track representation
// =============================================================================

/// One musical piece as discovered in one source corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub source_dataset: DatasetKind,
    /// 1-based, assigned in discovery order
    pub index: u32,
    pub artist: String,
    pub title: String,
    pub split: Split,
    /// Track directory in the source corpus
    pub path: PathBuf,
    /// Raw stem or instrument labels present in the source (informational)
    pub stems_available: Vec<String>,
    pub has_bleed: bool,
    pub flags: BTreeSet<TrackFlag>,
    /// Corpus-native display name and join key
    pub original_track_name: String,
}

impl Track {
    /// Create a track with no stems, flags or bleed annotation
    pub fn new(
        source_dataset: DatasetKind,
        artist: impl Into<String>,
        title: impl Into<String>,
        split: Split,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dataset,
            index: 0,
            artist: artist.into(),
            title: title.into(),
            split,
            path: path.into(),
            stems_available: Vec::new(),
            has_bleed: false,
            flags: BTreeSet::new(),
            original_track_name: String::new(),
        }
    }

    /// Corpus-native name if known, otherwise "Artist - Title"
    pub fn track_name(&self) -> String {
        if self.original_track_name.is_empty() {
            format!("{} - {}", self.artist, self.title)
        } else {
            self.original_track_name.clone()
        }
    }

    /// Stable key used by the split lock file
    pub fn split_key(&self) -> String {
        format!(
            "{}_{:04}_{}",
            self.source_dataset, self.index, self.original_track_name
        )
    }
}

/// What an adapter reports after writing a track's stems
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTrack {
    pub source_dataset: DatasetKind,
    pub original_track_name: String,
    pub artist: String,
    pub title: String,
    pub split: Split,
    /// Output categories actually written, in write order
    pub written_stems: Vec<String>,
    pub profile: String,
    pub has_bleed: bool,
    /// The corpus only ships vocals/drums/bass/other
    pub four_stem_only: bool,
    pub flags: BTreeSet<TrackFlag>,
}

impl ProcessedTrack {
    /// Start a result for `track` with nothing written yet
    pub fn for_track(track: &Track, profile: &str) -> Self {
        Self {
            source_dataset: track.source_dataset,
            original_track_name: track.track_name(),
            artist: track.artist.clone(),
            title: track.title.clone(),
            split: track.split,
            written_stems: Vec::new(),
            profile: profile.to_string(),
            has_bleed: track.has_bleed,
            four_stem_only: false,
            flags: track.flags.clone(),
        }
    }
}
