//! Unified error types for mss-datasets
//!
//! Error strategy:
//! - Per-track errors (decode, missing stems, bad sidecars): recoverable, the
//!   track is recorded in `errors.json` and the run continues
//! - Acquisition errors (bad corpus layout): the corpus is dropped from the run
//! - System errors (no usable corpus, cannot write metadata): fatal, abort run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for mss-datasets operations
#[derive(Debug, Error)]
pub enum AggregateError {
    // =========================================================================
    // Recoverable errors - record against the track, continue the run
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Failed to read metadata '{path}': {reason}")]
    MetadataError { path: PathBuf, reason: String },

    #[error("Track not found in {dataset}: {track}")]
    TrackNotFound { dataset: String, track: String },

    #[error("Unsupported channel count {channels} in '{path}' (expected mono or stereo)")]
    UnsupportedChannels { path: PathBuf, channels: usize },

    #[error("Cannot sum buffers with {left} and {right} channels")]
    ChannelMismatch { left: usize, right: usize },

    #[error("Sample rate mismatch for '{track}': {expected} Hz vs {found} Hz")]
    SampleRateMismatch {
        track: String,
        expected: u32,
        found: u32,
    },

    /// Summation was invoked without any buffers. Adapters must never do
    /// this, so it is surfaced as an error rather than an empty result.
    #[error("No stems to sum")]
    EmptySum,

    // =========================================================================
    // Acquisition errors - drop the corpus, continue with the others
    // =========================================================================
    #[error("{dataset} layout not recognized at '{path}': {reason}")]
    Layout {
        dataset: String,
        path: PathBuf,
        reason: String,
    },

    // =========================================================================
    // Fatal errors - abort the run
    // =========================================================================
    #[error("No valid datasets found")]
    NoValidDatasets,

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for mss-datasets operations
pub type Result<T> = std::result::Result<T, AggregateError>;

impl AggregateError {
    /// Returns true if this error only affects a single track
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AggregateError::DecodeError { .. }
                | AggregateError::MetadataError { .. }
                | AggregateError::TrackNotFound { .. }
                | AggregateError::UnsupportedChannels { .. }
                | AggregateError::ChannelMismatch { .. }
                | AggregateError::SampleRateMismatch { .. }
                | AggregateError::EmptySum
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AggregateError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a metadata error for an unreadable or malformed sidecar
    pub fn metadata_error(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AggregateError::MetadataError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a layout error for a corpus root that fails validation
    pub fn layout(
        dataset: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        AggregateError::Layout {
            dataset: dataset.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have write access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        AggregateError::OutputError { path, reason }
    }
}
