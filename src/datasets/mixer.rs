//! Per-track category accumulator shared by the multitrack adapters

use super::{ProcessOptions, MIXTURE_DIR};
use crate::audio::{is_silent, sum_stems, write_wav_atomic};
use crate::error::{AggregateError, Result};
use crate::mapping::{ProfileKind, CATCH_ALL};
use crate::naming::sanitize_filename;
use crate::types::{ProcessedTrack, Track, TrackFlag};
use ndarray::Array2;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Collects source buffers per output category, then sums and writes them
pub struct StemMixer {
    profile: ProfileKind,
    track_name: String,
    sample_rate: Option<u32>,
    buffers: BTreeMap<&'static str, Vec<Array2<f32>>>,
}

impl StemMixer {
    pub fn new(profile: ProfileKind, track_name: impl Into<String>) -> Self {
        Self {
            profile,
            track_name: track_name.into(),
            sample_rate: None,
            buffers: BTreeMap::new(),
        }
    }

    /// Add one stereo source buffer to `category`
    ///
    /// Categories outside the profile fall back to the catch-all. All
    /// sources of a track must share one sample rate.
    pub fn push(&mut self, category: &str, buffer: Array2<f32>, sample_rate: u32) -> Result<()> {
        match self.sample_rate {
            None => self.sample_rate = Some(sample_rate),
            Some(expected) if expected != sample_rate => {
                return Err(AggregateError::SampleRateMismatch {
                    track: self.track_name.clone(),
                    expected,
                    found: sample_rate,
                });
            }
            Some(_) => {}
        }

        let stems = self.profile.profile().stems;
        let category = match stems.iter().find(|s| **s == category) {
            Some(known) => *known,
            None => {
                warn!(
                    "Category '{}' is not in profile {} for {}, using '{}'",
                    category,
                    self.profile,
                    self.track_name,
                    CATCH_ALL
                );
                CATCH_ALL
            }
        };

        self.buffers.entry(category).or_default().push(buffer);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Sum each category and write one file per non-silent category
    ///
    /// Categories are written in profile order. Written categories and the
    /// `composite_sum` flag are recorded on `result`.
    pub fn write(
        self,
        track: &Track,
        options: &ProcessOptions,
        result: &mut ProcessedTrack,
    ) -> Result<()> {
        let Some(sample_rate) = self.sample_rate else {
            return Ok(());
        };

        let base = sanitize_filename(
            track.source_dataset,
            track.split,
            track.index,
            &track.artist,
            &track.title,
        );
        let mut mixture_parts = Vec::new();

        for category in self.profile.profile().stems {
            let Some(sources) = self.buffers.get(category) else {
                continue;
            };

            let combined = sum_stems(sources)?;
            if sources.len() > 1 {
                result.flags.insert(TrackFlag::CompositeSum);
            }

            if is_silent(&combined) {
                warn!(
                    "Skipping silent combined stem '{}' for {}",
                    category, self.track_name
                );
                continue;
            }

            let path = options.output_path(category, track.source_dataset, &base);
            write_wav_atomic(&path, &combined, sample_rate)?;
            debug!("{} -> {} ({} sources)", self.track_name, category, sources.len());
            result.written_stems.push(category.to_string());

            if options.include_mixtures {
                mixture_parts.push(combined);
            }
        }

        if !mixture_parts.is_empty() {
            let mixture = sum_stems(&mixture_parts)?;
            let path = options.output_path(MIXTURE_DIR, track.source_dataset, &base);
            write_wav_atomic(&path, &mixture, sample_rate)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::read_wav;
    use crate::types::{DatasetKind, Split};
    use tempfile::TempDir;

    fn options(dir: &TempDir, include_mixtures: bool) -> ProcessOptions {
        ProcessOptions {
            profile: ProfileKind::Vdbo,
            output: dir.path().to_path_buf(),
            group_by_dataset: false,
            include_mixtures,
        }
    }

    fn track() -> Track {
        let mut track = Track::new(DatasetKind::Medleydb, "Artist", "Song", Split::Train, "/src");
        track.index = 1;
        track.original_track_name = "Artist_Song".to_string();
        track
    }

    #[test]
    fn test_sums_category_and_flags_composite() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir, true);
        let track = track();
        let mut result = ProcessedTrack::for_track(&track, "vdbo");

        let mut mixer = StemMixer::new(ProfileKind::Vdbo, track.track_name());
        mixer.push("vocals", Array2::from_elem((10, 2), 0.25), 44100).unwrap();
        mixer.push("vocals", Array2::from_elem((5, 2), 0.25), 44100).unwrap();
        mixer.push("drums", Array2::zeros((10, 2)), 44100).unwrap();
        mixer.write(&track, &options, &mut result).unwrap();

        assert_eq!(result.written_stems, vec!["vocals"]);
        assert!(result.flags.contains(&TrackFlag::CompositeSum));

        let (vocals, _) = read_wav(&dir.path().join("vocals/medleydb_train_0001_artist_song.wav")).unwrap();
        assert_eq!(vocals.dim(), (10, 2));
        assert!((vocals[[0, 0]] - 0.5).abs() < 1e-6);
        assert!((vocals[[9, 0]] - 0.25).abs() < 1e-6);

        assert!(!dir.path().join("drums").exists());
        assert!(dir.path().join("mixture/medleydb_train_0001_artist_song.wav").exists());
    }

    #[test]
    fn test_category_outside_profile_goes_to_catch_all() {
        let dir = TempDir::new().unwrap();
        let track = track();
        let mut result = ProcessedTrack::for_track(&track, "vdbo");

        let mut mixer = StemMixer::new(ProfileKind::Vdbo, "t");
        mixer.push("guitar", Array2::from_elem((4, 2), 0.1), 44100).unwrap();
        mixer.write(&track, &options(&dir, false), &mut result).unwrap();

        assert_eq!(result.written_stems, vec!["other"]);
        assert!(!result.flags.contains(&TrackFlag::CompositeSum));
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let mut mixer = StemMixer::new(ProfileKind::Vdbo, "t");
        mixer.push("vocals", Array2::zeros((4, 2)), 44100).unwrap();
        let err = mixer.push("drums", Array2::zeros((4, 2)), 48000).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::SampleRateMismatch { expected: 44100, found: 48000, .. }
        ));
    }
}
