//! MoisesDB stem routing
//!
//! Most top-level MoisesDB stems map straight onto an output category.
//! `percussion` and `bass` mix instruments that belong in different
//! categories, so their sub-stems are routed one by one.

use super::profiles::{ProfileKind, CATCH_ALL};

/// Output category -> top-level MoisesDB stems summed into it
pub type TopLevelMapping = &'static [(&'static str, &'static [&'static str])];

pub const MOISESDB_VDBO: TopLevelMapping = &[
    ("vocals", &["vocals"]),
    ("drums", &["drums"]),
    (
        "other",
        &["other", "guitar", "other_plucked", "piano", "other_keys", "bowed_strings", "wind"],
    ),
];

pub const MOISESDB_VDBO_GP: TopLevelMapping = &[
    ("vocals", &["vocals"]),
    ("drums", &["drums"]),
    ("guitar", &["guitar"]),
    ("piano", &["piano"]),
    ("other", &["other", "other_plucked", "other_keys", "bowed_strings", "wind"]),
];

/// Percussion sub-stems (same for both profiles)
pub const PERCUSSION_ROUTING: &[(&str, &str)] = &[
    ("a-tonal_percussion_(claps,_shakers,_congas,_cowbell_etc)", "drums"),
    ("pitched_percussion_(mallets,_glockenspiel,_...)", "other"),
];

/// Bass sub-stems (same for both profiles)
pub const BASS_ROUTING: &[(&str, &str)] = &[
    ("bass_guitar", "bass"),
    ("bass_synthesizer_(moog_etc)", "bass"),
    ("contrabass/double_bass_(bass_of_instrings)", "bass"),
    ("tuba_(bass_of_brass)", "other"),
    ("bassoon_(bass_of_woodwind)", "other"),
];

/// How a top-level MoisesDB stem is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemRoute {
    /// The whole stem goes to one category
    Category(&'static str),
    /// Each sub-stem is looked up in the given table
    PerSubStem(&'static [(&'static str, &'static str)]),
    /// Not in any table
    Unknown,
}

pub fn moisesdb_mapping(profile: ProfileKind) -> TopLevelMapping {
    match profile {
        ProfileKind::Vdbo => MOISESDB_VDBO,
        ProfileKind::VdboGp => MOISESDB_VDBO_GP,
    }
}

/// Normalize a MoisesDB stem or sub-stem name to the routing-table form
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Route a top-level stem name
pub fn route_stem(stem_name: &str, profile: ProfileKind) -> StemRoute {
    let name = normalize_label(stem_name);
    match name.as_str() {
        "percussion" => return StemRoute::PerSubStem(PERCUSSION_ROUTING),
        "bass" => return StemRoute::PerSubStem(BASS_ROUTING),
        _ => {}
    }

    moisesdb_mapping(profile)
        .iter()
        .find(|(_, sources)| sources.contains(&name.as_str()))
        .map(|(category, _)| StemRoute::Category(category))
        .unwrap_or(StemRoute::Unknown)
}

/// Look up a sub-stem, `None` if the table does not know it
pub fn route_sub_stem(
    table: &'static [(&'static str, &'static str)],
    sub_stem: &str,
) -> Option<&'static str> {
    let name = normalize_label(sub_stem);
    table
        .iter()
        .find(|(label, _)| *label == name)
        .map(|(_, category)| *category)
}

/// Category used when a stem or sub-stem is not in any table
pub fn fallback_category() -> &'static str {
    CATCH_ALL
}
