//! Effective configuration snapshot (`config.yaml`)

use crate::config::Settings;
use crate::error::{AggregateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The options that shaped a run's output, as written to `config.yaml`
///
/// Fields are declared in alphabetical order so the YAML comes out sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub datasets: BTreeMap<String, String>,
    pub group_by_dataset: bool,
    pub include_bleed: bool,
    pub include_mixtures: bool,
    pub output: String,
    pub profile: String,
    pub workers: usize,
}

impl EffectiveConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let datasets = settings
            .dataset_paths()
            .map(|(kind, path)| (kind.as_str().to_string(), path.display().to_string()))
            .collect();

        Self {
            datasets,
            group_by_dataset: settings.group_by_dataset,
            include_bleed: settings.include_bleed,
            include_mixtures: settings.include_mixtures,
            output: settings.output.display().to_string(),
            profile: settings.profile.name().to_string(),
            workers: settings.workers,
        }
    }
}

/// Write the effective configuration as YAML
pub fn write_config(path: &Path, config: &EffectiveConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AggregateError::output_error(parent, e))?;
    }

    let yaml = serde_yaml::to_string(config).map_err(|e| AggregateError::OutputError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let temp_path = path.with_extension("yaml.tmp");
    std::fs::write(&temp_path, yaml).map_err(|e| AggregateError::output_error(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AggregateError::output_error(path, e)
    })?;

    Ok(())
}
