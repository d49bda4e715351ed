//! YAML configuration file
//!
//! Top-level keys mirror the command-line options. Corpus paths may also be
//! nested under `datasets:`; a top-level key wins over its nested twin.
//!
//! ```yaml
//! datasets:
//!   musdb18hq_path: /data/musdb18hq
//!   medleydb_path: /data/medleydb
//! output: ./output
//! profile: vdbo+gp
//! workers: 8
//! ```

use crate::error::{AggregateError, Result};
use crate::mapping::ProfileKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    #[serde(alias = "musdb18hq")]
    pub musdb18hq_path: Option<PathBuf>,
    #[serde(alias = "moisesdb")]
    pub moisesdb_path: Option<PathBuf>,
    #[serde(alias = "medleydb")]
    pub medleydb_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    datasets: DatasetPaths,
    musdb18hq_path: Option<PathBuf>,
    moisesdb_path: Option<PathBuf>,
    medleydb_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub profile: Option<ProfileKind>,
    pub workers: Option<usize>,
    pub include_mixtures: Option<bool>,
    pub group_by_dataset: Option<bool>,
    pub include_bleed: Option<bool>,
    pub medleydb_overrides: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AggregateError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|e| AggregateError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes as null
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Corpus paths with `datasets:` flattened in
    pub fn dataset_paths(&self) -> DatasetPaths {
        DatasetPaths {
            musdb18hq_path: self
                .musdb18hq_path
                .clone()
                .or_else(|| self.datasets.musdb18hq_path.clone()),
            moisesdb_path: self
                .moisesdb_path
                .clone()
                .or_else(|| self.datasets.moisesdb_path.clone()),
            medleydb_path: self
                .medleydb_path
                .clone()
                .or_else(|| self.datasets.medleydb_path.clone()),
        }
    }
}
