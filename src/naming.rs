//! Output filenames and cross-corpus name matching

use crate::types::{DatasetKind, Split};
use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of the artist/title part of an output filename
const MAX_NAME_LEN: usize = 80;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]").expect("Invalid filename regex"));
static UNDERSCORE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("Invalid underscore regex"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_\-]").expect("Invalid separator regex"));

/// Build the deterministic output filename stem for a track
///
/// Format: `{dataset}_{split}_{index:04}_{artist}_{title}` (no extension).
pub fn sanitize_filename(
    dataset: DatasetKind,
    split: Split,
    index: u32,
    artist: &str,
    title: &str,
) -> String {
    let mut name = sanitize_text(&format!("{}_{}", artist, title));
    if name.len() > MAX_NAME_LEN {
        // sanitized text is pure ASCII, so byte truncation is safe
        name.truncate(MAX_NAME_LEN);
        let trimmed = name.trim_end_matches('_').len();
        name.truncate(trimmed);
    }
    format!("{}_{}_{:04}_{}", dataset, split, index, name)
}

/// Transliterate, lowercase, and replace anything outside `[a-z0-9_-]`
fn sanitize_text(text: &str) -> String {
    let ascii = deunicode(text).to_lowercase();
    let replaced = DISALLOWED.replace_all(&ascii, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Normalize a track name for overlap matching
///
/// Lowercases and strips whitespace, underscores and hyphens so that
/// `"A Classic Education - NightOwl"` and `"AClassicEducation_NightOwl"`
/// compare equal.
pub fn canonical_name(name: &str) -> String {
    SEPARATORS.replace_all(&name.to_lowercase(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_filename() {
        let name = sanitize_filename(
            DatasetKind::Musdb18hq,
            Split::Train,
            1,
            "Artist Name",
            "Track Title",
        );
        assert_eq!(name, "musdb18hq_train_0001_artist_name_track_title");
    }

    #[test]
    fn test_unicode_transliteration() {
        let name = sanitize_filename(
            DatasetKind::Medleydb,
            Split::Train,
            3,
            "Héctor Müller",
            "Über Straße",
        );
        assert!(name.contains("hector_muller"), "{}", name);
        assert!(name.contains("uber_strasse"), "{}", name);
    }

    #[test]
    fn test_special_chars_replaced() {
        let name = sanitize_filename(DatasetKind::Moisesdb, Split::Val, 42, "Art!st", "Track (remix)");
        assert!(!name.contains('!'));
        assert!(!name.contains('('));
        assert!(!name.contains(')'));
        assert!(!name.contains("__"));
    }

    #[test]
    fn test_truncation() {
        let artist = "A".repeat(50);
        let title = "B".repeat(50);
        let name = sanitize_filename(DatasetKind::Musdb18hq, Split::Train, 1, &artist, &title);
        let prefix = "musdb18hq_train_0001_";
        assert!(name.starts_with(prefix));
        assert!(name.len() - prefix.len() <= MAX_NAME_LEN);
        assert!(!name.ends_with('_'));
    }

    #[test]
    fn test_index_padding_and_hyphens() {
        let name = sanitize_filename(DatasetKind::Musdb18hq, Split::Test, 9999, "A-B", "C-D");
        assert_eq!(name, "musdb18hq_test_9999_a-b_c-d");
    }

    #[test]
    fn test_canonical_name_symmetry() {
        let a = canonical_name("A Classic Education - NightOwl");
        let b = canonical_name("AClassicEducation_NightOwl");
        let c = canonical_name("aclassiceducation nightowl");
        assert_eq!(a, "aclassiceducationnightowl");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_canonical_name_strips_tabs() {
        assert_eq!(canonical_name("Music\tDelta -  Rock"), "musicdeltarock");
    }
}
