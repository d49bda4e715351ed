//! MUSDB18-HQ / MedleyDB overlap registry and resolution
//!
//! 46 MUSDB18-HQ tracks were taken from MedleyDB. When both corpora are part
//! of a run, MedleyDB's copy wins (it has per-instrument stems) and the
//! MUSDB18-HQ copy is skipped. The MedleyDB copy inherits the MUSDB18-HQ split
//! so that the test set stays comparable with published MUSDB18 results.

use crate::naming::canonical_name;
use crate::types::Split;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap, HashSet};

/// MUSDB18-HQ tracks that originate from MedleyDB ("Artist - Title")
pub const MUSDB_MEDLEYDB_OVERLAP: [&str; 46] = [
    "A Classic Education - NightOwl",
    "Aimee Norwich - Child",
    "Alexander Ross - Goodbye Bolero",
    "Alexander Ross - Velvet Curtain",
    "Auctioneer - Our Future Faces",
    "AvaLuna - Waterduct",
    "BigTroubles - Phantom",
    "Celestial Shore - Die For Us",
    "Clara Berry And Wooldog - Air Traffic",
    "Clara Berry And Wooldog - Stella",
    "Clara Berry And Wooldog - Waltz For My Victims",
    "Creepoid - OldTree",
    "Dreamers Of The Ghetto - Heavy Love",
    "Faces On Film - Waiting For Ga",
    "Grants - PunchDrunk",
    "Helado Negro - Mitad Del Mundo",
    "Hezekiah Jones - Borrowed Heart",
    "Hop Along - Sister Cities",
    "Invisible Familiars - Disturbing Wildlife",
    "Lushlife - Toynbee Suite",
    "Matthew Entwistle - Dont You Ever",
    "Meaxic - Take A Step",
    "Meaxic - You Listen",
    "Music Delta - 80s Rock",
    "Music Delta - Beatles",
    "Music Delta - Britpop",
    "Music Delta - Country1",
    "Music Delta - Country2",
    "Music Delta - Disco",
    "Music Delta - Gospel",
    "Music Delta - Grunge",
    "Music Delta - Hendrix",
    "Music Delta - Punk",
    "Music Delta - Reggae",
    "Music Delta - Rock",
    "Music Delta - Rockabilly",
    "Night Panther - Fire",
    "Port St Willow - Stay Even",
    "Secret Mountains - High Horse",
    "Snowmine - Curfews",
    "Steven Clark - Bounty",
    "Strand Of Oaks - Spacestation",
    "Sweet Lights - You Let Me Down",
    "The Districts - Vermont",
    "The Scarlet Brand - Les Fleurs Du Mal",
    "The So So Glos - Emergency",
];

static CANONICAL_OVERLAP: Lazy<HashSet<String>> = Lazy::new(|| {
    MUSDB_MEDLEYDB_OVERLAP
        .iter()
        .map(|name| canonical_name(name))
        .collect()
});

/// True if `track_name` (in either corpus's naming style) is a known duplicate
pub fn is_overlap_track(track_name: &str) -> bool {
    CANONICAL_OVERLAP.contains(&canonical_name(track_name))
}

/// Outcome of overlap resolution for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapResolution {
    /// MUSDB18-HQ track names to drop from this run
    pub skip: BTreeSet<String>,
    /// Canonical name -> MUSDB18-HQ split, for MedleyDB tracks to inherit
    pub inherited_splits: HashMap<String, Split>,
}

/// Decide which MUSDB18-HQ tracks to skip in favour of their MedleyDB copies
///
/// `candidates` are `(track name, split)` pairs from MUSDB18-HQ discovery.
/// Without MedleyDB in the run nothing is skipped.
pub fn resolve_overlaps<'a, I>(candidates: I, medleydb_present: bool) -> OverlapResolution
where
    I: IntoIterator<Item = (&'a str, Split)>,
{
    let mut resolution = OverlapResolution::default();
    if !medleydb_present {
        return resolution;
    }

    for (name, split) in candidates {
        if is_overlap_track(name) {
            resolution.skip.insert(name.to_string());
            resolution
                .inherited_splits
                .insert(canonical_name(name), split);
        }
    }

    resolution
}
