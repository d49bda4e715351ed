//! Split assignment and locking
//!
//! Rules, in priority order:
//! 1. A split recorded in a previous run's `splits.json` is reused verbatim
//! 2. MUSDB18-HQ keeps the split encoded in its directory layout
//! 3. MedleyDB tracks that duplicate a MUSDB18-HQ track inherit its split
//! 4. Everything else defaults to train, except a fixed-seed selection of
//!    MoisesDB tracks that forms the validation set

use crate::error::{AggregateError, Result};
use crate::export::json::write_json_atomic;
use crate::naming::canonical_name;
use crate::overlap::is_overlap_track;
use crate::types::{DatasetKind, Split, Track};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Seed for the MoisesDB validation selection
pub const MOISESDB_VAL_SEED: u64 = 42;

/// Number of MoisesDB tracks placed in the validation set
pub const MOISESDB_VAL_SIZE: usize = 50;

/// Persisted split lock: stable track key -> split
pub type SplitLock = BTreeMap<String, Split>;

/// Assign a split to every track in place
///
/// `inherited` maps canonical track names to the split of the skipped
/// MUSDB18-HQ copy (see [`crate::overlap::resolve_overlaps`]).
pub fn assign_splits(tracks: &mut [Track], locked: &SplitLock, inherited: &HashMap<String, Split>) {
    let mut locked_count = 0usize;

    for track in tracks.iter_mut() {
        if let Some(split) = locked.get(&track.split_key()) {
            track.split = *split;
            locked_count += 1;
            continue;
        }

        match track.source_dataset {
            // split comes from the train/ and test/ directories
            DatasetKind::Musdb18hq => {}
            DatasetKind::Medleydb => {
                track.split = if is_overlap_track(&track.original_track_name) {
                    inherited
                        .get(&canonical_name(&track.original_track_name))
                        .copied()
                        .unwrap_or(Split::Train)
                } else {
                    Split::Train
                };
            }
            DatasetKind::Moisesdb => {}
        }
    }

    if locked_count > 0 {
        info!("Reused {} locked splits from a previous run", locked_count);
    }

    assign_moisesdb_val(tracks, locked);
}

/// Deterministically carve the MoisesDB validation set out of train
///
/// The shuffle covers every MoisesDB track in discovery order, so the chosen
/// positions do not depend on which tracks happen to be locked.
fn assign_moisesdb_val(tracks: &mut [Track], locked: &SplitLock) {
    let mut moisesdb: Vec<&mut Track> = tracks
        .iter_mut()
        .filter(|t| t.source_dataset == DatasetKind::Moisesdb)
        .collect();
    if moisesdb.is_empty() {
        return;
    }

    let val_positions = val_positions(moisesdb.len());

    for (position, track) in moisesdb.iter_mut().enumerate() {
        if locked.contains_key(&track.split_key()) {
            continue;
        }
        track.split = if val_positions[position] {
            Split::Val
        } else {
            Split::Train
        };
    }

    debug!(
        "MoisesDB validation set: {} of {} tracks",
        val_positions.iter().filter(|v| **v).count(),
        moisesdb.len()
    );
}

/// Mark the first `min(MOISESDB_VAL_SIZE, n)` positions of a seeded shuffle
fn val_positions(n: usize) -> Vec<bool> {
    let mut rng = ChaCha8Rng::seed_from_u64(MOISESDB_VAL_SEED);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let mut selected = vec![false; n];
    for &i in indices.iter().take(MOISESDB_VAL_SIZE.min(n)) {
        selected[i] = true;
    }
    selected
}

/// Load `splits.json` from a previous run, if present
pub fn load_splits(path: &Path) -> Result<Option<SplitLock>> {
    if !path.exists() {
        debug!("No split lock at {}", path.display());
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| AggregateError::metadata_error(path, e))?;
    let lock: SplitLock = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AggregateError::metadata_error(path, e))?;

    debug!("Loaded {} locked splits from {}", lock.len(), path.display());
    Ok(Some(lock))
}

/// Merge this run's assignments into the previous lock
pub fn merged_lock(previous: &SplitLock, tracks: &[Track]) -> SplitLock {
    let mut lock = previous.clone();
    for track in tracks {
        lock.insert(track.split_key(), track.split);
    }
    lock
}

/// Write `splits.json`
pub fn write_splits(path: &Path, lock: &SplitLock) -> Result<()> {
    write_json_atomic(path, lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_track(dataset: DatasetKind, index: u32, name: &str, split: Split) -> Track {
        let mut track = Track::new(dataset, "Art", name, split, "/fake");
        track.index = index;
        track.original_track_name = name.to_string();
        track
    }

    fn moisesdb_tracks(n: u32) -> Vec<Track> {
        (1..=n)
            .map(|i| make_track(DatasetKind::Moisesdb, i, &format!("Art - Song{}", i), Split::Train))
            .collect()
    }

    #[test]
    fn test_musdb_directory_splits_preserved() {
        let mut tracks = vec![
            make_track(DatasetKind::Musdb18hq, 1, "A - One", Split::Train),
            make_track(DatasetKind::Musdb18hq, 2, "A - Two", Split::Test),
        ];
        assign_splits(&mut tracks, &SplitLock::new(), &HashMap::new());
        assert_eq!(tracks[0].split, Split::Train);
        assert_eq!(tracks[1].split, Split::Test);
    }

    #[test]
    fn test_medleydb_overlap_inherits_split() {
        let mut tracks = vec![
            make_track(DatasetKind::Medleydb, 1, "AClassicEducation_NightOwl", Split::Train),
            make_track(DatasetKind::Medleydb, 2, "UniqueArtist_UniqueSong", Split::Test),
        ];
        let mut inherited = HashMap::new();
        inherited.insert(canonical_name("A Classic Education - NightOwl"), Split::Test);

        assign_splits(&mut tracks, &SplitLock::new(), &inherited);
        assert_eq!(tracks[0].split, Split::Test);
        assert_eq!(tracks[1].split, Split::Train);
    }

    #[test]
    fn test_medleydb_overlap_without_inheritance_defaults_train() {
        let mut tracks = vec![make_track(
            DatasetKind::Medleydb,
            1,
            "AClassicEducation_NightOwl",
            Split::Test,
        )];
        assign_splits(&mut tracks, &SplitLock::new(), &HashMap::new());
        assert_eq!(tracks[0].split, Split::Train);
    }

    #[test]
    fn test_moisesdb_val_size() {
        let mut tracks = moisesdb_tracks(240);
        assign_splits(&mut tracks, &SplitLock::new(), &HashMap::new());

        let val = tracks.iter().filter(|t| t.split == Split::Val).count();
        let train = tracks.iter().filter(|t| t.split == Split::Train).count();
        assert_eq!(val, 50);
        assert_eq!(train, 190);
    }

    #[test]
    fn test_moisesdb_val_deterministic() {
        let mut first = moisesdb_tracks(240);
        let mut second = moisesdb_tracks(240);
        assign_splits(&mut first, &SplitLock::new(), &HashMap::new());
        assign_splits(&mut second, &SplitLock::new(), &HashMap::new());

        let val_first: Vec<u32> = first.iter().filter(|t| t.split == Split::Val).map(|t| t.index).collect();
        let val_second: Vec<u32> = second.iter().filter(|t| t.split == Split::Val).map(|t| t.index).collect();
        assert_eq!(val_first, val_second);
    }

    #[test]
    fn test_moisesdb_fewer_than_50_all_val() {
        let mut tracks = moisesdb_tracks(10);
        assign_splits(&mut tracks, &SplitLock::new(), &HashMap::new());
        assert!(tracks.iter().all(|t| t.split == Split::Val));
    }

    #[test]
    fn test_lock_takes_precedence() {
        let mut tracks = vec![make_track(DatasetKind::Musdb18hq, 1, "A - One", Split::Train)];
        let mut locked = SplitLock::new();
        locked.insert("musdb18hq_0001_A - One".to_string(), Split::Test);

        assign_splits(&mut tracks, &locked, &HashMap::new());
        assert_eq!(tracks[0].split, Split::Test);
    }

    #[test]
    fn test_lock_beats_moisesdb_carve_out() {
        let mut tracks = moisesdb_tracks(10);
        let mut locked = SplitLock::new();
        locked.insert(tracks[3].split_key(), Split::Test);

        assign_splits(&mut tracks, &locked, &HashMap::new());
        assert_eq!(tracks[3].split, Split::Test);
        assert_eq!(tracks.iter().filter(|t| t.split == Split::Val).count(), 9);
    }

    #[test]
    fn test_lock_roundtrip_and_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata").join("splits.json");
        assert!(load_splits(&path).unwrap().is_none());

        let mut previous = SplitLock::new();
        previous.insert("moisesdb_0001_Gone - Track".to_string(), Split::Val);
        let tracks = vec![make_track(DatasetKind::Musdb18hq, 1, "A - One", Split::Test)];

        let lock = merged_lock(&previous, &tracks);
        write_splits(&path, &lock).unwrap();

        let loaded = load_splits(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["musdb18hq_0001_A - One"], Split::Test);
        assert_eq!(loaded["moisesdb_0001_Gone - Track"], Split::Val);
    }
}
