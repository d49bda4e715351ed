//! MUSDB18-HQ adapter
//!
//! Layout: `<root>/{train,test}/<Artist - Title>/{vocals,drums,bass,other,mixture}.wav`.
//! The four stems are already in output categories, so nothing is summed.

use super::{assign_indices, list_subdirs, DatasetAdapter, ProcessOptions, MIXTURE_DIR};
use crate::audio::{ensure_stereo, is_silent, read_wav, write_wav_atomic};
use crate::error::{AggregateError, Result};
use crate::naming::sanitize_filename;
use crate::types::{DatasetKind, ProcessedTrack, Split, Track};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Stems shipped with every MUSDB18-HQ track
pub const MUSDB_STEMS: [&str; 4] = ["vocals", "drums", "bass", "other"];

pub struct Musdb18hqAdapter {
    root: PathBuf,
}

impl Musdb18hqAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Split `"Artist - Title"`, or use the whole name for both
fn parse_folder_name(name: &str) -> (String, String) {
    match name.split_once(" - ") {
        Some((artist, title)) => (artist.to_string(), title.to_string()),
        None => (name.to_string(), name.to_string()),
    }
}

impl DatasetAdapter for Musdb18hqAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Musdb18hq
    }

    fn validate_layout(&self) -> Result<()> {
        for split in [Split::Train, Split::Test] {
            let dir = self.root.join(split.as_str());
            if !dir.is_dir() {
                return Err(AggregateError::layout(
                    self.kind().display_name(),
                    &self.root,
                    format!("missing {}/ directory: {}", split, dir.display()),
                ));
            }
        }
        Ok(())
    }

    fn discover(&self) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();

        for split in [Split::Train, Split::Test] {
            for dir in list_subdirs(&self.root.join(split.as_str())) {
                let name = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let (artist, title) = parse_folder_name(&name);

                let mut track = Track::new(self.kind(), artist, title, split, &dir);
                track.stems_available = MUSDB_STEMS.iter().map(|s| s.to_string()).collect();
                track.original_track_name = name;
                tracks.push(track);
            }
        }

        assign_indices(&mut tracks);
        debug!("Discovered {} MUSDB18-HQ tracks", tracks.len());
        Ok(tracks)
    }

    fn process(&self, track: &Track, options: &ProcessOptions) -> Result<ProcessedTrack> {
        let mut result = ProcessedTrack::for_track(track, options.profile.name());
        result.four_stem_only = true;

        let base = sanitize_filename(
            track.source_dataset,
            track.split,
            track.index,
            &track.artist,
            &track.title,
        );

        for stem in MUSDB_STEMS {
            let source = track.path.join(format!("{}.wav", stem));
            if !source.exists() {
                warn!("Missing stem {} for {}", stem, track.track_name());
                continue;
            }

            let (buffer, sample_rate) = read_wav(&source)?;
            let buffer = ensure_stereo(buffer, &source)?;
            if is_silent(&buffer) {
                warn!("Skipping silent stem {} for {}", stem, track.track_name());
                continue;
            }

            write_wav_atomic(
                &options.output_path(stem, track.source_dataset, &base),
                &buffer,
                sample_rate,
            )?;
            result.written_stems.push(stem.to_string());
        }

        if options.include_mixtures {
            let source = track.path.join("mixture.wav");
            if source.exists() {
                let (buffer, sample_rate) = read_wav(&source)?;
                let buffer = ensure_stereo(buffer, &source)?;
                write_wav_atomic(
                    &options.output_path(MIXTURE_DIR, track.source_dataset, &base),
                    &buffer,
                    sample_rate,
                )?;
            } else {
                warn!("Missing mixture.wav for {}", track.track_name());
            }
        }

        Ok(result)
    }
}
