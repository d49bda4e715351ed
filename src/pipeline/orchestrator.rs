//! Pipeline orchestration
//!
//! Acquire corpora, drop duplicates and bleed tracks, assign splits, write
//! category stems (in parallel where the adapter allows it), validate the
//! output tree and persist run metadata.

use super::report::{DryRunReport, RunReport, SummaryReport};
use crate::audio::{probe_wav, EXPECTED_CHANNELS, EXPECTED_SAMPLE_RATE};
use crate::config::Settings;
use crate::datasets::{DatasetAdapter, DatasetSource, ProcessOptions, MIXTURE_DIR};
use crate::error::{AggregateError, Result};
use crate::export::{
    self, load_manifest, EffectiveConfig, ErrorEntry, ErrorStage, ManifestEntry, OverlapRegistry,
};
use crate::overlap::{resolve_overlaps, OverlapResolution};
use crate::splits::{self, SplitLock};
use crate::types::{DatasetKind, ProcessedTrack, Track};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Metadata directory under the output root
pub const METADATA_DIR: &str = "metadata";

/// An acquired corpus: its adapter plus the recipe to rebuild it on workers
struct Corpus {
    source: DatasetSource,
    adapter: Box<dyn DatasetAdapter>,
}

/// Tracks that survived deduplication, with what was dropped along the way
struct Selection {
    tracks: Vec<Track>,
    overlap: OverlapResolution,
    excluded_bleed: usize,
}

type Outcome = std::result::Result<ProcessedTrack, ErrorEntry>;

type SharedAdapters = HashMap<DatasetKind, Box<dyn DatasetAdapter + Send + Sync>>;

/// Run the full aggregation pipeline
pub fn run(settings: &Settings) -> Result<RunReport> {
    let pipeline_start = Instant::now();
    let mut errors: Vec<ErrorEntry> = Vec::new();

    // Phase 1: Acquire
    let corpora = acquire(settings, &mut errors);
    if corpora.is_empty() {
        error!("No valid datasets found");
        return Err(AggregateError::NoValidDatasets);
    }

    // Phase 2: Discover and deduplicate
    let discovery_start = Instant::now();
    let (corpora, mut selection) = discover(corpora, settings.include_bleed, &mut errors);
    if corpora.is_empty() {
        error!("No valid datasets found");
        return Err(AggregateError::NoValidDatasets);
    }
    info!(
        "Selected {} tracks in {:.2}s",
        selection.tracks.len(),
        discovery_start.elapsed().as_secs_f64()
    );

    // Phase 3: Splits
    let metadata_dir = settings.output.join(METADATA_DIR);
    let previous_lock = splits::load_splits(&metadata_dir.join("splits.json"))?.unwrap_or_default();
    splits::assign_splits(
        &mut selection.tracks,
        &previous_lock,
        &selection.overlap.inherited_splits,
    );

    if settings.dry_run {
        return Ok(RunReport::DryRun(dry_run_report(settings, &selection)));
    }

    std::fs::create_dir_all(&settings.output)
        .map_err(|e| AggregateError::output_error(&settings.output, e))?;
    cleanup_temp_files(&settings.output);

    // Phase 4: Process
    let options = ProcessOptions::from_settings(settings);
    let (resumed, pending): (Vec<&Track>, Vec<&Track>) = selection
        .tracks
        .iter()
        .partition(|track| options.expected_outputs(track).iter().any(|p| p.exists()));

    if !resumed.is_empty() {
        info!("Skipping {} already-processed tracks", resumed.len());
    }

    let previous_manifest = load_manifest(&metadata_dir.join("manifest.json"));
    let mut entries: Vec<ManifestEntry> = resumed
        .iter()
        .map(|track| resumed_entry(track, &options, &previous_manifest))
        .collect();

    if !pending.is_empty() {
        let process_start = Instant::now();
        info!("Processing {} tracks", pending.len());

        for outcome in process_tracks(&pending, &corpora, &options, settings)? {
            match outcome {
                Ok(processed) => entries.push(ManifestEntry::from(processed)),
                Err(entry) => errors.push(entry),
            }
        }

        info!(
            "Processing completed in {:.2}s",
            process_start.elapsed().as_secs_f64()
        );
    }

    // Phase 5: Validate
    errors.extend(validate_outputs(&options));

    // Phase 6: Metadata
    let lock = splits::merged_lock(&previous_lock, &selection.tracks);
    write_metadata(&metadata_dir, settings, &entries, &lock, &selection, &errors)?;

    let summary = summarize(settings, &selection, errors.len());
    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(RunReport::Summary(summary))
}

/// Open and validate every configured corpus, dropping the ones that fail
fn acquire(settings: &Settings, errors: &mut Vec<ErrorEntry>) -> Vec<Corpus> {
    let mut corpora = Vec::new();

    for source in settings.dataset_sources() {
        let acquired = source.open().and_then(|adapter| {
            adapter.validate_layout()?;
            Ok(adapter)
        });

        match acquired {
            Ok(adapter) => {
                info!(
                    "Using {} at {}",
                    source.kind.display_name(),
                    source.root.display()
                );
                corpora.push(Corpus { source, adapter });
            }
            Err(e) => {
                warn!("Skipping {}: {}", source.kind.display_name(), e);
                errors.push(ErrorEntry::new("", source.kind.as_str(), &e, ErrorStage::Acquire));
            }
        }
    }

    corpora
}

/// Discover tracks, then drop MUSDB18-HQ duplicates and bleed-flagged tracks
fn discover(
    corpora: Vec<Corpus>,
    include_bleed: bool,
    errors: &mut Vec<ErrorEntry>,
) -> (Vec<Corpus>, Selection) {
    let mut kept = Vec::new();
    let mut tracks = Vec::new();

    for corpus in corpora {
        match corpus.adapter.discover() {
            Ok(found) => {
                info!(
                    "Discovered {} {} tracks",
                    found.len(),
                    corpus.source.kind.display_name()
                );
                tracks.extend(found);
                kept.push(corpus);
            }
            Err(e) => {
                warn!("Skipping {}: {}", corpus.source.kind.display_name(), e);
                errors.push(ErrorEntry::new(
                    "",
                    corpus.source.kind.as_str(),
                    &e,
                    ErrorStage::Acquire,
                ));
            }
        }
    }

    let medleydb_present = kept
        .iter()
        .any(|c| c.source.kind == DatasetKind::Medleydb);
    let overlap = resolve_overlaps(
        tracks
            .iter()
            .filter(|t| t.source_dataset == DatasetKind::Musdb18hq)
            .map(|t| (t.original_track_name.as_str(), t.split)),
        medleydb_present,
    );
    if !overlap.skip.is_empty() {
        info!(
            "Skipping {} MUSDB18-HQ tracks duplicated in MedleyDB",
            overlap.skip.len()
        );
        tracks.retain(|t| {
            t.source_dataset != DatasetKind::Musdb18hq
                || !overlap.skip.contains(&t.original_track_name)
        });
    }

    let mut excluded_bleed = 0;
    if !include_bleed {
        let before = tracks.len();
        tracks.retain(|t| !t.has_bleed);
        excluded_bleed = before - tracks.len();
        if excluded_bleed > 0 {
            info!("Excluded {} tracks flagged with bleed", excluded_bleed);
        }
    }

    for kind in DatasetKind::ALL {
        let count = tracks.iter().filter(|t| t.source_dataset == kind).count();
        if count > 0 {
            debug!("{}: {} tracks after deduplication", kind.display_name(), count);
        }
    }

    (
        kept,
        Selection {
            tracks,
            overlap,
            excluded_bleed,
        },
    )
}

fn dry_run_report(settings: &Settings, selection: &Selection) -> DryRunReport {
    let mut by_dataset = BTreeMap::new();
    let mut by_split = BTreeMap::new();
    for track in &selection.tracks {
        *by_dataset
            .entry(track.source_dataset.as_str().to_string())
            .or_insert(0) += 1;
        *by_split.entry(track.split.as_str().to_string()).or_insert(0) += 1;
    }

    let mut stem_folders: Vec<String> = settings
        .profile
        .profile()
        .stems
        .iter()
        .map(|s| s.to_string())
        .collect();
    if settings.include_mixtures {
        stem_folders.push(MIXTURE_DIR.to_string());
    }

    DryRunReport {
        profile: settings.profile.name().to_string(),
        total_tracks: selection.tracks.len(),
        by_dataset,
        by_split,
        skipped_musdb_overlap: selection.overlap.skip.len(),
        excluded_bleed: selection.excluded_bleed,
        stem_folders,
    }
}

/// Remove `*.tmp` files left behind by an interrupted run
fn cleanup_temp_files(output: &Path) {
    let mut removed = 0usize;
    for entry in WalkDir::new(output)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "tmp"))
    {
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Cannot remove {}: {}", entry.path().display(), e),
        }
    }
    if removed > 0 {
        info!("Removed {} temporary files from a previous run", removed);
    }
}

/// Manifest entry for a track whose outputs already exist
///
/// Reuses the previous run's entry when it matches; otherwise rebuilds one
/// from the stem files on disk.
fn resumed_entry(
    track: &Track,
    options: &ProcessOptions,
    previous: &BTreeMap<String, ManifestEntry>,
) -> ManifestEntry {
    let profile = options.profile.profile();
    let mut processed = ProcessedTrack::for_track(track, profile.name);
    processed.four_stem_only = track.source_dataset == DatasetKind::Musdb18hq;
    processed.written_stems = profile
        .stems
        .iter()
        .zip(options.expected_outputs(track))
        .filter(|(_, path)| path.exists())
        .map(|(stem, _)| stem.to_string())
        .collect();

    let rebuilt = ManifestEntry::from(processed);
    match previous.get(&rebuilt.key()) {
        Some(entry) if entry.profile == rebuilt.profile => entry.clone(),
        _ => {
            debug!("Rebuilt manifest entry for {}", rebuilt.key());
            rebuilt
        }
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Process pending tracks, pooling the shareable corpora
///
/// Tracks of corpora whose adapter cannot leave this thread are drained
/// sequentially after the pooled work.
fn process_tracks(
    pending: &[&Track],
    corpora: &[Corpus],
    options: &ProcessOptions,
    settings: &Settings,
) -> Result<Vec<Outcome>> {
    let sources: HashMap<DatasetKind, &DatasetSource> =
        corpora.iter().map(|c| (c.source.kind, &c.source)).collect();
    let (shared, pinned): (Vec<&Track>, Vec<&Track>) = pending
        .iter()
        .copied()
        .partition(|t| t.source_dataset.is_shareable());

    let progress = settings.show_progress.then(|| progress_bar(pending.len()));
    let failed = AtomicUsize::new(0);

    let tick = |track: &Track, outcome: &Outcome| {
        if outcome.is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(ref pb) = progress {
            pb.inc(1);
            pb.set_message(track.track_name());
        }
    };

    let run_shared = |cache: &mut SharedAdapters, track: &Track| {
        let outcome = match sources.get(&track.source_dataset) {
            Some(source) => match shared_adapter(cache, source) {
                Ok(adapter) => process_one(adapter, track, options),
                Err(e) => Err(track_error(track, &e)),
            },
            None => Err(ErrorEntry::new(
                track.track_name(),
                track.source_dataset.as_str(),
                "corpus was not acquired",
                ErrorStage::Process,
            )),
        };
        tick(track, &outcome);
        outcome
    };

    let workers = settings.effective_workers();
    let mut outcomes: Vec<Outcome> = if workers > 1 && shared.len() > 1 {
        debug!("Processing {} tracks on {} workers", shared.len(), workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| {
                AggregateError::ConfigError(format!("Failed to build thread pool: {}", e))
            })?;
        pool.install(|| {
            shared
                .par_iter()
                .map_init(SharedAdapters::new, |cache, track| run_shared(cache, *track))
                .collect()
        })
    } else {
        let mut cache = SharedAdapters::new();
        shared
            .iter()
            .map(|track| run_shared(&mut cache, *track))
            .collect()
    };

    for track in pinned {
        let outcome = match corpora
            .iter()
            .find(|c| c.source.kind == track.source_dataset)
        {
            Some(corpus) => process_one(corpus.adapter.as_ref(), track, options),
            None => Err(ErrorEntry::new(
                track.track_name(),
                track.source_dataset.as_str(),
                "corpus was not acquired",
                ErrorStage::Process,
            )),
        };
        tick(track, &outcome);
        outcomes.push(outcome);
    }

    if let Some(pb) = progress {
        pb.finish_with_message("Processing complete");
    }

    let failed = failed.load(Ordering::Relaxed);
    if failed > 0 {
        warn!("{} of {} tracks failed (see errors.json)", failed, pending.len());
    }

    Ok(outcomes)
}

/// Adapter for `source` owned by the current worker, built on first use
fn shared_adapter<'a>(
    cache: &'a mut SharedAdapters,
    source: &DatasetSource,
) -> Result<&'a (dyn DatasetAdapter + Send + Sync)> {
    let adapter = match cache.entry(source.kind) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            let adapter = source.open_shared()?.ok_or_else(|| {
                AggregateError::ConfigError(format!(
                    "{} adapter cannot run on worker threads",
                    source.kind.display_name()
                ))
            })?;
            entry.insert(adapter)
        }
    };
    Ok(&**adapter)
}

fn track_error(track: &Track, error: &AggregateError) -> ErrorEntry {
    ErrorEntry::new(
        track.track_name(),
        track.source_dataset.as_str(),
        error,
        ErrorStage::Process,
    )
}

/// Process one track, turning errors and panics into error entries
fn process_one(adapter: &dyn DatasetAdapter, track: &Track, options: &ProcessOptions) -> Outcome {
    let name = track.track_name();
    debug!("Processing: {}", name);

    match panic::catch_unwind(AssertUnwindSafe(|| adapter.process(track, options))) {
        Ok(Ok(processed)) => Ok(processed),
        Ok(Err(e)) => {
            if e.is_recoverable() {
                warn!("Skipping {}: {}", name, e);
            } else {
                error!("Failed {}: {}", name, e);
            }
            Err(track_error(track, &e))
        }
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!("Processing {} panicked: {}", name, panic_msg);
            Err(ErrorEntry::new(
                name,
                track.source_dataset.as_str(),
                format!("panic: {}", panic_msg),
                ErrorStage::Process,
            ))
        }
    }
}

/// Output categories scanned by validation and the summary
fn output_categories(options: &ProcessOptions) -> Vec<&'static str> {
    let mut categories = options.profile.profile().stems.to_vec();
    if options.include_mixtures {
        categories.push(MIXTURE_DIR);
    }
    categories
}

/// All `.wav` files under `dir`, sorted
fn wav_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "wav"))
        .map(|e| e.into_path())
        .collect()
}

/// Dataset a written file belongs to, from its filename prefix
fn dataset_of(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    DatasetKind::ALL
        .into_iter()
        .find(|kind| name.starts_with(&format!("{}_", kind.as_str())))
        .map_or("unknown", |kind| kind.as_str())
}

/// Check every written WAV for the expected sample rate and channel count
fn validate_outputs(options: &ProcessOptions) -> Vec<ErrorEntry> {
    let start = Instant::now();
    let mut errors = Vec::new();
    let mut checked = 0usize;

    for category in output_categories(options) {
        for path in wav_files(&options.output.join(category)) {
            checked += 1;
            let problem = match probe_wav(&path) {
                Ok((rate, channels))
                    if rate == EXPECTED_SAMPLE_RATE && channels == EXPECTED_CHANNELS =>
                {
                    continue
                }
                Ok((rate, channels)) => format!(
                    "unexpected format: {} Hz, {} channels (expected {} Hz, {} channels)",
                    rate, channels, EXPECTED_SAMPLE_RATE, EXPECTED_CHANNELS
                ),
                Err(e) => e.to_string(),
            };

            warn!("Validation failed for {}: {}", path.display(), problem);
            let track = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            errors.push(ErrorEntry::new(
                track,
                dataset_of(&path),
                problem,
                ErrorStage::Validate,
            ));
        }
    }

    debug!(
        "Validated {} files in {:.2}s",
        checked,
        start.elapsed().as_secs_f64()
    );
    errors
}

fn write_metadata(
    metadata_dir: &Path,
    settings: &Settings,
    entries: &[ManifestEntry],
    lock: &SplitLock,
    selection: &Selection,
    errors: &[ErrorEntry],
) -> Result<()> {
    let start = Instant::now();

    export::write_manifest(&metadata_dir.join("manifest.json"), entries)?;
    splits::write_splits(&metadata_dir.join("splits.json"), lock)?;
    export::write_overlap_registry(
        &metadata_dir.join("overlap_registry.json"),
        &OverlapRegistry::new(selection.overlap.skip.iter().cloned()),
    )?;
    export::write_errors(&metadata_dir.join("errors.json"), errors)?;
    export::write_config(
        &metadata_dir.join("config.yaml"),
        &EffectiveConfig::from_settings(settings),
    )?;

    info!(
        "Metadata written in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Count output files per category; `total_tracks` includes tracks that failed
fn summarize(settings: &Settings, selection: &Selection, errors: usize) -> SummaryReport {
    let mut stem_counts = BTreeMap::new();
    let mut disk_usage_bytes = 0u64;

    for stem in settings.profile.profile().stems {
        let files = wav_files(&settings.output.join(stem));
        disk_usage_bytes += files
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum::<u64>();
        stem_counts.insert(stem.to_string(), files.len());
    }

    SummaryReport {
        profile: settings.profile.name().to_string(),
        total_tracks: selection.tracks.len(),
        total_files: stem_counts.values().sum(),
        stem_counts,
        disk_usage_bytes,
        errors,
        skipped_musdb_overlap: selection.overlap.skip.len(),
        excluded_bleed: selection.excluded_bleed,
    }
}
