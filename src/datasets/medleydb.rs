//! MedleyDB adapter
//!
//! Layout: `<root>/Audio/<Artist_Title>/<Artist_Title>_METADATA.yaml` with
//! stems at `<Artist_Title>_STEMS/<Artist_Title>_STEM_<NN>.wav`. The sidecar
//! maps each stem key (`S01`, ...) to an instrument label, which is routed
//! through the MedleyDB instrument table.

use super::{assign_indices, list_subdirs, DatasetAdapter, ProcessOptions, StemMixer};
use crate::audio::{ensure_stereo, is_silent, read_wav};
use crate::error::{AggregateError, Result};
use crate::mapping::{resolve_medleydb_label, MedleyOverrides};
use crate::types::{DatasetKind, ProcessedTrack, Split, Track};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const METADATA_SUFFIX: &str = "_METADATA.yaml";

pub struct MedleydbAdapter {
    root: PathBuf,
    overrides: MedleyOverrides,
}

/// The parts of a `*_METADATA.yaml` sidecar the pipeline reads
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackMetadata {
    artist: Value,
    title: Value,
    has_bleed: Value,
    stems: BTreeMap<String, StemMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StemMetadata {
    instrument: Value,
}

/// Scalar YAML value as a non-empty string
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

impl TrackMetadata {
    fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| AggregateError::metadata_error(path, e))?;
        serde_yaml::from_str(&text).map_err(|e| AggregateError::metadata_error(path, e))
    }

    fn has_bleed(&self) -> bool {
        match &self.has_bleed {
            Value::String(s) => s.trim().eq_ignore_ascii_case("yes"),
            Value::Bool(b) => *b,
            _ => false,
        }
    }
}

impl StemMetadata {
    /// Instrument label; multi-instrument stems use their first label
    fn label(&self) -> Option<String> {
        match &self.instrument {
            Value::Sequence(labels) => labels.first().and_then(scalar_string),
            other => scalar_string(other),
        }
    }
}

impl MedleydbAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_overrides(root, MedleyOverrides::default())
    }

    pub fn with_overrides(root: impl Into<PathBuf>, overrides: MedleyOverrides) -> Self {
        Self {
            root: root.into(),
            overrides,
        }
    }

    fn audio_dir(&self) -> PathBuf {
        self.root.join("Audio")
    }

    /// Locate the track's sidecar, ignoring macOS resource forks
    fn find_metadata(track_dir: &Path) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(track_dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(METADATA_SUFFIX) && !n.starts_with("._"))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}

/// Split `"Artist_Title"` at the first underscore
fn parse_folder_name(name: &str) -> (String, String) {
    match name.split_once('_') {
        Some((artist, title)) => (artist.to_string(), title.to_string()),
        None => (name.to_string(), name.to_string()),
    }
}

impl DatasetAdapter for MedleydbAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Medleydb
    }

    fn validate_layout(&self) -> Result<()> {
        let audio = self.audio_dir();
        if !audio.is_dir() {
            return Err(AggregateError::layout(
                self.kind().display_name(),
                &self.root,
                format!("missing Audio/ directory: {}", audio.display()),
            ));
        }
        Ok(())
    }

    fn discover(&self) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();

        for dir in list_subdirs(&self.audio_dir()) {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if self.overrides.is_track_excluded(&name) {
                info!("Excluding track {} (override: track excluded)", name);
                continue;
            }

            let Some(metadata_path) = Self::find_metadata(&dir) else {
                warn!("No METADATA.yaml in {}, skipping", name);
                continue;
            };
            let metadata = match TrackMetadata::load(&metadata_path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    error!("Skipping {}: {}", name, e);
                    continue;
                }
            };

            let (folder_artist, folder_title) = parse_folder_name(&name);
            let artist = scalar_string(&metadata.artist).unwrap_or(folder_artist);
            let title = scalar_string(&metadata.title).unwrap_or(folder_title);

            let mut track = Track::new(self.kind(), artist, title, Split::Train, &dir);
            track.has_bleed = metadata.has_bleed();
            track.stems_available = metadata.stems.values().filter_map(StemMetadata::label).collect();
            track.original_track_name = name;
            tracks.push(track);
        }

        assign_indices(&mut tracks);
        debug!("Discovered {} MedleyDB tracks", tracks.len());
        Ok(tracks)
    }

    fn process(&self, track: &Track, options: &ProcessOptions) -> Result<ProcessedTrack> {
        let metadata_path = Self::find_metadata(&track.path).ok_or_else(|| {
            AggregateError::metadata_error(&track.path, "no METADATA.yaml in track directory")
        })?;
        let metadata = TrackMetadata::load(&metadata_path)?;

        let track_name = track.original_track_name.as_str();
        let mut result = ProcessedTrack::for_track(track, options.profile.name());
        let mut mixer = StemMixer::new(options.profile, track.track_name());

        for (stem_key, stem) in &metadata.stems {
            if self.overrides.is_stem_excluded(track_name, stem_key) {
                info!("Excluding stem {}/{} (override: stem excluded)", track_name, stem_key);
                continue;
            }

            let Some(instrument) = stem.label() else {
                continue;
            };

            let (target, flag) = resolve_medleydb_label(&instrument, options.profile);
            if let Some(flag) = flag {
                result.flags.insert(flag);
            }
            let Some(mut target) = target.map(str::to_string) else {
                debug!("Dropping premixed stem {}/{}", track_name, stem_key);
                continue;
            };

            if let Some(rerouted) = self.overrides.reroute(track_name, stem_key) {
                if options.profile.profile().contains(rerouted) {
                    info!(
                        "Rerouting stem {}/{}: {} -> {} (override)",
                        track_name, stem_key, target, rerouted
                    );
                    target = rerouted.to_string();
                } else {
                    warn!(
                        "Ignoring reroute of {}/{} to '{}': not in profile {}",
                        track_name, stem_key, rerouted, options.profile
                    );
                }
            }

            let number = stem_key.trim_start_matches('S');
            let source = track
                .path
                .join(format!("{}_STEMS", track_name))
                .join(format!("{}_STEM_{}.wav", track_name, number));
            if !source.exists() {
                warn!("Missing stem file {}", source.display());
                continue;
            }

            let (buffer, sample_rate) = read_wav(&source)?;
            let buffer = ensure_stereo(buffer, &source)?;
            if is_silent(&buffer) {
                warn!(
                    "Skipping silent stem '{}' ({}) for {}",
                    stem_key, instrument, track_name
                );
                continue;
            }
            mixer.push(&target, buffer, sample_rate)?;
        }

        if mixer.is_empty() {
            warn!("Track {} produced no output (all stems filtered)", track_name);
            return Ok(result);
        }

        mixer.write(track, options, &mut result)?;
        Ok(result)
    }
}
