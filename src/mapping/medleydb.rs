//! MedleyDB instrument taxonomy -> output categories

use super::profiles::{ProfileKind, CATCH_ALL};
use crate::error::{AggregateError, Result};
use crate::types::TrackFlag;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::warn;

const VOCALS: &[&str] = &[
    "male singer", "female singer", "male speaker", "female speaker",
    "male rapper", "female rapper", "male screamer", "female screamer",
    "vocalists", "choir", "beatboxing",
];

const DRUMS: &[&str] = &[
    "drum set", "drum machine", "kick drum", "snare drum", "bass drum",
    "toms", "timpani", "bongo", "conga", "darbuka", "doumbek", "tabla",
    "tambourine", "auxiliary percussion", "high hat", "cymbal", "gong",
    "triangle", "cowbell", "sleigh bells", "cabasa", "guiro", "gu",
    "castanet", "claps", "rattle", "shaker", "maracas", "snaps",
];

const BASS: &[&str] = &["electric bass", "double bass"];

const GUITARS: &[&str] = &[
    "acoustic guitar", "clean electric guitar", "distorted electric guitar",
    "lap steel guitar", "slide guitar",
];

const PIANOS: &[&str] = &["piano", "tack piano", "electric piano"];

const OTHER: &[&str] = &[
    // pitched percussion
    "xylophone", "vibraphone", "marimba", "glockenspiel", "chimes",
    // bowed strings
    "erhu", "violin", "viola", "cello", "dilruba",
    "violin section", "viola section", "cello section", "string section",
    // plucked strings
    "banjo", "guzheng", "harp", "harpsichord", "liuqin",
    "mandolin", "oud", "sitar", "ukulele", "zhongruan",
    // struck strings
    "dulcimer", "yangqin",
    // flutes
    "dizi", "flute", "flute section", "piccolo", "bamboo flute", "panpipes", "recorder",
    // single reeds
    "alto saxophone", "baritone saxophone", "bass clarinet", "clarinet",
    "clarinet section", "tenor saxophone", "soprano saxophone",
    // double reeds
    "oboe", "english horn", "bassoon", "bagpipe",
    // brass
    "trumpet", "cornet", "trombone", "french horn", "euphonium", "tuba",
    "brass section", "french horn section", "trombone section", "horn section", "trumpet section",
    // free reeds
    "harmonica", "concertina", "accordion", "bandoneon", "harmonium", "pipe organ", "melodica",
    // electronic
    "synthesizer", "theremin", "fx/processed sound", "scratch", "sampler", "electronic organ",
    // voices
    "crowd",
];

/// Targets for one label: (4-stem profile, 6-stem profile)
type Targets = (&'static str, &'static str);

static INSTRUMENTS: Lazy<HashMap<&'static str, Targets>> = Lazy::new(|| {
    let groups: [(&[&str], Targets); 6] = [
        (VOCALS, ("vocals", "vocals")),
        (DRUMS, ("drums", "drums")),
        (BASS, ("bass", "bass")),
        (GUITARS, (CATCH_ALL, "guitar")),
        (PIANOS, (CATCH_ALL, "piano")),
        (OTHER, (CATCH_ALL, CATCH_ALL)),
    ];
    groups
        .iter()
        .flat_map(|(labels, targets)| labels.iter().map(move |label| (*label, *targets)))
        .collect()
});

/// Resolve a MedleyDB instrument label to an output category
///
/// Returns `(None, Some(Exclude))` for the premixed "Main System" stem. An
/// "Unlabeled" or unknown instrument goes to the catch-all category with a
/// flag; this never fails.
pub fn resolve_medleydb_label(
    label: &str,
    profile: ProfileKind,
) -> (Option<&'static str>, Option<TrackFlag>) {
    let lower = label.trim().to_lowercase();

    match lower.as_str() {
        "main system" => (None, Some(TrackFlag::Exclude)),
        "unlabeled" => (Some(CATCH_ALL), Some(TrackFlag::Unlabeled)),
        _ => match INSTRUMENTS.get(lower.as_str()) {
            Some((vdbo, vdbo_gp)) => {
                let target = match profile {
                    ProfileKind::Vdbo => *vdbo,
                    ProfileKind::VdboGp => *vdbo_gp,
                };
                (Some(target), None)
            }
            None => {
                warn!("Unknown MedleyDB instrument label {:?}, routing to '{}'", label, CATCH_ALL);
                (Some(CATCH_ALL), Some(TrackFlag::UnknownLabel))
            }
        },
    }
}

/// Per-track and per-stem corrections for MedleyDB metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MedleyOverrides {
    /// Track directory names skipped entirely
    pub exclude_tracks: BTreeSet<String>,
    /// Track name -> stem keys (`S01`, ...) to drop
    pub exclude_stems: BTreeMap<String, BTreeSet<String>>,
    /// Track name -> stem key -> output category
    pub reroute_stems: BTreeMap<String, BTreeMap<String, String>>,
}

impl MedleyOverrides {
    /// Load overrides from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| AggregateError::metadata_error(path, e))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|e| AggregateError::metadata_error(path, e))
    }

    pub fn is_track_excluded(&self, track: &str) -> bool {
        self.exclude_tracks.contains(track)
    }

    pub fn is_stem_excluded(&self, track: &str, stem_key: &str) -> bool {
        self.exclude_stems
            .get(track)
            .is_some_and(|stems| stems.contains(stem_key))
    }

    pub fn reroute(&self, track: &str, stem_key: &str) -> Option<&str> {
        self.reroute_stems
            .get(track)
            .and_then(|stems| stems.get(stem_key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_label_groups_vdbo() {
        assert_eq!(resolve_medleydb_label("female singer", ProfileKind::Vdbo).0, Some("vocals"));
        assert_eq!(resolve_medleydb_label("drum set", ProfileKind::Vdbo).0, Some("drums"));
        assert_eq!(resolve_medleydb_label("electric bass", ProfileKind::Vdbo).0, Some("bass"));
        assert_eq!(resolve_medleydb_label("acoustic guitar", ProfileKind::Vdbo).0, Some("other"));
        assert_eq!(resolve_medleydb_label("piano", ProfileKind::Vdbo).0, Some("other"));
        assert_eq!(resolve_medleydb_label("violin", ProfileKind::Vdbo), (Some("other"), None));
    }

    #[test]
    fn test_guitar_and_piano_split_out_in_six_stem() {
        for label in GUITARS {
            assert_eq!(resolve_medleydb_label(label, ProfileKind::VdboGp).0, Some("guitar"));
        }
        for label in PIANOS {
            assert_eq!(resolve_medleydb_label(label, ProfileKind::VdboGp).0, Some("piano"));
        }
        assert_eq!(resolve_medleydb_label("male singer", ProfileKind::VdboGp).0, Some("vocals"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(resolve_medleydb_label("Violin", ProfileKind::Vdbo).0, Some("other"));
        assert_eq!(
            resolve_medleydb_label("MAIN SYSTEM", ProfileKind::Vdbo),
            (None, Some(TrackFlag::Exclude))
        );
    }

    #[test]
    fn test_unlabeled_and_unknown_route_to_catch_all() {
        assert_eq!(
            resolve_medleydb_label("Unlabeled", ProfileKind::Vdbo),
            (Some("other"), Some(TrackFlag::Unlabeled))
        );
        assert_eq!(
            resolve_medleydb_label("totally_unknown_instrument", ProfileKind::VdboGp),
            (Some("other"), Some(TrackFlag::UnknownLabel))
        );
    }

    #[test]
    fn test_table_has_no_duplicate_labels() {
        let total = VOCALS.len() + DRUMS.len() + BASS.len() + GUITARS.len() + PIANOS.len() + OTHER.len();
        assert_eq!(INSTRUMENTS.len(), total);
    }

    #[test]
    fn test_overrides_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.yaml");
        std::fs::write(
            &path,
            "exclude_tracks:\n  - Bad_Track\nexclude_stems:\n  Some_Track: [S03]\nreroute_stems:\n  Some_Track:\n    S01: vocals\n",
        )
        .unwrap();

        let overrides = MedleyOverrides::load(&path).unwrap();
        assert!(overrides.is_track_excluded("Bad_Track"));
        assert!(overrides.is_stem_excluded("Some_Track", "S03"));
        assert!(!overrides.is_stem_excluded("Some_Track", "S01"));
        assert_eq!(overrides.reroute("Some_Track", "S01"), Some("vocals"));
        assert_eq!(overrides.reroute("Other_Track", "S01"), None);
    }
}
