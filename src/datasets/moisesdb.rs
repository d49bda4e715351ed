//! MoisesDB adapter
//!
//! Layout: `<root>/moisesdb_v0.1/<provider>/<track>/data.json` (official) or
//! `<root>/<track>/data.json` (flat, after a manual unzip). Each `data.json`
//! lists top-level stems and the source files inside them; audio lives at
//! `<track>/<stemName>/<id>.<extension>`.
//!
//! Parsed documents are cached per adapter in a single-threaded cache, so the
//! adapter is neither `Send` nor `Sync` and is always driven from one thread.

use super::{assign_indices, list_subdirs, DatasetAdapter, ProcessOptions, StemMixer};
use crate::audio::{ensure_stereo, is_silent, read_wav};
use crate::error::{AggregateError, Result};
use crate::mapping::moisesdb::fallback_category;
use crate::mapping::{route_stem, route_sub_stem, StemRoute};
use crate::types::{DatasetKind, ProcessedTrack, Split, Track};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

const OFFICIAL_DIR: &str = "moisesdb_v0.1";
const DOCUMENT: &str = "data.json";

/// `data.json` for one track
#[derive(Debug, Clone, Deserialize)]
pub struct TrackDocument {
    pub artist: String,
    pub song: String,
    #[serde(default)]
    pub stems: Vec<StemDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StemDocument {
    #[serde(rename = "stemName")]
    pub stem_name: String,
    #[serde(default)]
    pub tracks: Vec<SourceDocument>,
}

/// One recorded source inside a stem
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    #[serde(rename = "trackType", default)]
    pub track_type: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "wav".to_string()
}

impl TrackDocument {
    pub fn track_name(&self) -> String {
        format!("{} - {}", self.artist, self.song)
    }
}

pub struct MoisesdbAdapter {
    root: PathBuf,
    documents: RefCell<HashMap<PathBuf, Rc<TrackDocument>>>,
}

impl MoisesdbAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: RefCell::new(HashMap::new()),
        }
    }

    /// Track directories in stable order, for either layout
    fn track_dirs(&self) -> Vec<PathBuf> {
        let official = self.root.join(OFFICIAL_DIR);
        let candidates: Vec<PathBuf> = if official.is_dir() {
            list_subdirs(&official)
                .iter()
                .flat_map(|provider| list_subdirs(provider))
                .collect()
        } else {
            list_subdirs(&self.root)
        };

        candidates
            .into_iter()
            .filter(|dir| dir.join(DOCUMENT).is_file())
            .collect()
    }

    /// Parse `data.json` once per track directory
    fn document(&self, track_dir: &Path) -> Result<Rc<TrackDocument>> {
        if let Some(doc) = self.documents.borrow().get(track_dir) {
            return Ok(Rc::clone(doc));
        }

        let path = track_dir.join(DOCUMENT);
        let text =
            std::fs::read_to_string(&path).map_err(|e| AggregateError::metadata_error(&path, e))?;
        let doc: TrackDocument =
            serde_json::from_str(&text).map_err(|e| AggregateError::metadata_error(&path, e))?;

        let doc = Rc::new(doc);
        self.documents
            .borrow_mut()
            .insert(track_dir.to_path_buf(), Rc::clone(&doc));
        Ok(doc)
    }
}

impl DatasetAdapter for MoisesdbAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Moisesdb
    }

    fn validate_layout(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(AggregateError::layout(
                self.kind().display_name(),
                &self.root,
                "directory does not exist",
            ));
        }
        if self.root.join(OFFICIAL_DIR).is_dir() || !self.track_dirs().is_empty() {
            return Ok(());
        }
        Err(AggregateError::layout(
            self.kind().display_name(),
            &self.root,
            format!(
                "expected {}/ or track directories containing {}",
                OFFICIAL_DIR, DOCUMENT
            ),
        ))
    }

    fn discover(&self) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();

        for dir in self.track_dirs() {
            let doc = match self.document(&dir) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping {}: {}", dir.display(), e);
                    continue;
                }
            };

            // Split is provisional; the validation carve-out runs later
            let mut track = Track::new(self.kind(), &doc.artist, &doc.song, Split::Train, &dir);
            track.stems_available = doc.stems.iter().map(|s| s.stem_name.clone()).collect();
            track.original_track_name = doc.track_name();
            tracks.push(track);
        }

        assign_indices(&mut tracks);
        debug!("Discovered {} MoisesDB tracks", tracks.len());
        Ok(tracks)
    }

    fn process(&self, track: &Track, options: &ProcessOptions) -> Result<ProcessedTrack> {
        let doc = self.document(&track.path)?;
        if doc.track_name() != track.original_track_name {
            return Err(AggregateError::TrackNotFound {
                dataset: self.kind().display_name().to_string(),
                track: track.original_track_name.clone(),
            });
        }

        let mut result = ProcessedTrack::for_track(track, options.profile.name());
        let mut mixer = StemMixer::new(options.profile, track.track_name());

        for stem in &doc.stems {
            let route = route_stem(&stem.stem_name, options.profile);
            if route == StemRoute::Unknown {
                warn!(
                    "Unknown stem {:?} in {}, routing to '{}'",
                    stem.stem_name,
                    track.track_name(),
                    fallback_category()
                );
            }

            for source in &stem.tracks {
                let category = match route {
                    StemRoute::Category(category) => category,
                    StemRoute::PerSubStem(table) => route_sub_stem(table, &source.track_type)
                        .unwrap_or_else(|| {
                            warn!(
                                "Unknown {} sub-stem {:?} in {}, routing to '{}'",
                                stem.stem_name,
                                source.track_type,
                                track.track_name(),
                                fallback_category()
                            );
                            fallback_category()
                        }),
                    StemRoute::Unknown => fallback_category(),
                };

                let file = track
                    .path
                    .join(&stem.stem_name)
                    .join(format!("{}.{}", source.id, source.extension));
                if !file.exists() {
                    warn!("Missing source file {}", file.display());
                    continue;
                }

                let (buffer, sample_rate) = read_wav(&file)?;
                let buffer = ensure_stereo(buffer, &file)?;
                if is_silent(&buffer) {
                    debug!("Skipping silent source {}", file.display());
                    continue;
                }
                mixer.push(category, buffer, sample_rate)?;
            }
        }

        if mixer.is_empty() {
            warn!("Track {} produced no output", track.track_name());
            return Ok(result);
        }

        mixer.write(track, options, &mut result)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ProfileKind;
    use crate::types::TrackFlag;
    use tempfile::TempDir;

    fn write_constant(path: &Path, value: f32, frames: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * 2 {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// `sources` are `(stemName, trackType, value)`
    fn make_track(dir: &Path, artist: &str, song: &str, sources: &[(&str, &str, f32)]) {
        let mut stems: Vec<serde_json::Value> = Vec::new();
        for (i, (stem_name, track_type, value)) in sources.iter().enumerate() {
            let id = format!("src{}", i);
            write_constant(&dir.join(stem_name).join(format!("{}.wav", id)), *value, 16);
            stems.push(serde_json::json!({
                "stemName": stem_name,
                "tracks": [{ "id": id, "trackType": track_type, "extension": "wav" }]
            }));
        }
        let doc = serde_json::json!({
            "artist": artist, "song": song, "genre": "rock", "stems": stems
        });
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(DOCUMENT), doc.to_string()).unwrap();
    }

    fn options(output: &Path, profile: ProfileKind) -> ProcessOptions {
        ProcessOptions {
            profile,
            output: output.to_path_buf(),
            group_by_dataset: false,
            include_mixtures: false,
        }
    }

    #[test]
    fn test_validate_layouts() {
        let dir = TempDir::new().unwrap();
        let adapter = MoisesdbAdapter::new(dir.path());
        assert!(adapter.validate_layout().is_err());

        make_track(&dir.path().join("track-a"), "A", "B", &[("vocals", "lead", 0.1)]);
        assert!(adapter.validate_layout().is_ok());

        let official = TempDir::new().unwrap();
        std::fs::create_dir_all(official.path().join(OFFICIAL_DIR)).unwrap();
        assert!(MoisesdbAdapter::new(official.path()).validate_layout().is_ok());

        assert!(MoisesdbAdapter::new("/nonexistent/moisesdb").validate_layout().is_err());
    }

    #[test]
    fn test_discover_official_layout() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join(OFFICIAL_DIR);
        make_track(&base.join("provider1").join("b-track"), "Artist B", "Song B", &[]);
        make_track(&base.join("provider1").join("a-track"), "Artist A", "Song A", &[]);
        make_track(&base.join("provider2").join("c-track"), "Artist C", "Song C", &[]);

        let tracks = MoisesdbAdapter::new(dir.path()).discover().unwrap();
        let names: Vec<_> = tracks.iter().map(|t| t.original_track_name.as_str()).collect();
        assert_eq!(names, vec!["Artist A - Song A", "Artist B - Song B", "Artist C - Song C"]);
        assert_eq!(tracks[2].index, 3);
        assert!(tracks.iter().all(|t| t.split == Split::Train));
    }

    #[test]
    fn test_process_routes_percussion_and_bass_sub_stems() {
        let corpus = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let track_dir = corpus.path().join("t1");
        make_track(
            &track_dir,
            "Artist",
            "Song",
            &[
                ("vocals", "lead_female_singer", 0.1),
                ("percussion", "a-tonal percussion (claps, shakers, congas, cowbell etc)", 0.1),
                ("percussion", "pitched percussion (mallets, glockenspiel, ...)", 0.1),
                ("bass", "bass guitar", 0.1),
                ("bass", "tuba (bass of brass)", 0.1),
                ("guitar", "clean_electric_guitar", 0.1),
                ("drums", "kick_drum", 0.0),
                ("theremin_stem", "whatever", 0.1),
            ],
        );

        let adapter = MoisesdbAdapter::new(corpus.path());
        let track = adapter.discover().unwrap().remove(0);
        let result = adapter
            .process(&track, &options(output.path(), ProfileKind::VdboGp))
            .unwrap();

        assert_eq!(result.written_stems, vec!["vocals", "drums", "bass", "guitar", "other"]);
        assert!(result.flags.contains(&TrackFlag::CompositeSum));

        // pitched percussion + tuba + unknown stem
        let (other, _) =
            read_wav(&output.path().join("other/moisesdb_train_0001_artist_song.wav")).unwrap();
        assert!((other[[0, 0]] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_document_cache_is_reused() {
        let corpus = TempDir::new().unwrap();
        make_track(&corpus.path().join("t1"), "A", "B", &[("vocals", "lead", 0.1)]);

        let adapter = MoisesdbAdapter::new(corpus.path());
        let first = adapter.document(&corpus.path().join("t1")).unwrap();
        let second = adapter.document(&corpus.path().join("t1")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_mismatched_document_is_track_not_found() {
        let corpus = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        make_track(&corpus.path().join("t1"), "A", "B", &[("vocals", "lead", 0.1)]);

        let adapter = MoisesdbAdapter::new(corpus.path());
        let mut track = adapter.discover().unwrap().remove(0);
        track.original_track_name = "Someone - Else".to_string();

        let err = adapter
            .process(&track, &options(output.path(), ProfileKind::Vdbo))
            .unwrap_err();
        assert!(matches!(err, AggregateError::TrackNotFound { .. }));
    }
}
