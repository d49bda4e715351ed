//! mss-datasets - Music source separation dataset aggregation
//!
//! Merges MUSDB18-HQ, MedleyDB and MoisesDB into one output tree with a
//! folder per stem category. Each source track's stems are routed to the
//! categories of the chosen profile and summed, duplicates across corpora are
//! resolved, splits are assigned deterministically and locked across runs,
//! and provenance is recorded in JSON manifests.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing, YAML config file and runtime settings
//! - `datasets`: one adapter per corpus (validate, discover, process)
//! - `mapping`: stem profiles and per-corpus label routing tables
//! - `audio`: WAV I/O and buffer summation
//! - `overlap` / `splits` / `naming`: deduplication, split assignment, filenames
//! - `pipeline`: orchestration and reports
//! - `export`: manifest, errors, overlap registry and config snapshots
//!
//! # Example
//!
//! ```no_run
//! use mss_datasets::{config::Settings, pipeline};
//! use std::path::PathBuf;
//!
//! let settings = Settings {
//!     musdb18hq_path: Some(PathBuf::from("/data/musdb18hq")),
//!     ..Settings::default()
//! };
//! let report = pipeline::run(&settings).expect("Aggregation failed");
//! println!("{}", report);
//! ```

pub mod audio;
pub mod config;
pub mod datasets;
pub mod error;
pub mod export;
pub mod mapping;
pub mod naming;
pub mod overlap;
pub mod pipeline;
pub mod splits;
pub mod types;

// Re-export key types at crate root
pub use config::Settings;
pub use error::{AggregateError, Result};
pub use pipeline::{run, RunReport};
pub use types::{DatasetKind, ProcessedTrack, Split, Track, TrackFlag};
