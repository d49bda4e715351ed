//! Runtime configuration settings

use super::cli::Cli;
use super::file::ConfigFile;
use crate::datasets::DatasetSource;
use crate::error::{AggregateError, Result};
use crate::mapping::ProfileKind;
use crate::types::DatasetKind;
use std::path::{Path, PathBuf};

/// Runtime settings for one aggregation run
#[derive(Debug, Clone)]
pub struct Settings {
    /// MUSDB18-HQ root
    pub musdb18hq_path: Option<PathBuf>,
    /// MoisesDB root
    pub moisesdb_path: Option<PathBuf>,
    /// MedleyDB root
    pub medleydb_path: Option<PathBuf>,
    /// Output root
    pub output: PathBuf,
    /// Output stem profile
    pub profile: ProfileKind,
    /// Worker threads; 0 means one per logical CPU
    pub workers: usize,
    /// Write a full mixture per track
    pub include_mixtures: bool,
    /// Nest output under `<category>/<dataset>/`
    pub group_by_dataset: bool,
    /// Keep tracks flagged with stem bleed
    pub include_bleed: bool,
    /// Report only, write nothing
    pub dry_run: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// MedleyDB overrides YAML
    pub medleydb_overrides: Option<PathBuf>,
}

impl Settings {
    /// Create settings from CLI arguments, reading `--config` if given
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(cli, &file)
    }

    /// Command line over config file over built-in defaults
    pub fn merge(cli: &Cli, file: &ConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let paths = file.dataset_paths();

        let profile = match &cli.profile {
            Some(name) => name.parse().map_err(AggregateError::ConfigError)?,
            None => file.profile.unwrap_or(defaults.profile),
        };

        Ok(Self {
            musdb18hq_path: cli.musdb18hq_path.clone().or(paths.musdb18hq_path),
            moisesdb_path: cli.moisesdb_path.clone().or(paths.moisesdb_path),
            medleydb_path: cli.medleydb_path.clone().or(paths.medleydb_path),
            output: cli
                .output
                .clone()
                .or_else(|| file.output.clone())
                .unwrap_or(defaults.output),
            profile,
            workers: cli.workers.or(file.workers).unwrap_or(defaults.workers),
            include_mixtures: cli.include_mixtures || file.include_mixtures.unwrap_or(false),
            group_by_dataset: cli.group_by_dataset || file.group_by_dataset.unwrap_or(false),
            include_bleed: cli.include_bleed || file.include_bleed.unwrap_or(false),
            dry_run: cli.dry_run,
            show_progress: !cli.quiet,
            medleydb_overrides: cli
                .medleydb_overrides
                .clone()
                .or_else(|| file.medleydb_overrides.clone()),
        })
    }

    /// Configured corpus roots in discovery order
    pub fn dataset_paths(&self) -> impl Iterator<Item = (DatasetKind, &Path)> + '_ {
        DatasetKind::ALL.into_iter().filter_map(move |kind| {
            let path = match kind {
                DatasetKind::Musdb18hq => &self.musdb18hq_path,
                DatasetKind::Medleydb => &self.medleydb_path,
                DatasetKind::Moisesdb => &self.moisesdb_path,
            };
            path.as_deref().map(|p| (kind, p))
        })
    }

    /// Adapter recipes for every configured corpus
    pub fn dataset_sources(&self) -> Vec<DatasetSource> {
        self.dataset_paths()
            .map(|(kind, root)| {
                let mut source = DatasetSource::new(kind, root);
                if kind == DatasetKind::Medleydb {
                    source.overrides = self.medleydb_overrides.clone();
                }
                source
            })
            .collect()
    }

    /// Worker count with `0` resolved to the number of logical CPUs
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.dataset_paths().next().is_none() {
            return Err(AggregateError::ConfigError(
                "at least one dataset path is required \
                 (--musdb18hq-path, --moisesdb-path or --medleydb-path)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            musdb18hq_path: None,
            moisesdb_path: None,
            medleydb_path: None,
            output: PathBuf::from("./output"),
            profile: ProfileKind::Vdbo,
            workers: 1,
            include_mixtures: false,
            group_by_dataset: false,
            include_bleed: false,
            dry_run: false,
            show_progress: true,
            medleydb_overrides: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let settings = Settings::merge(&Cli::default(), &ConfigFile::default()).unwrap();
        assert_eq!(settings.output, PathBuf::from("./output"));
        assert_eq!(settings.profile, ProfileKind::Vdbo);
        assert_eq!(settings.workers, 1);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            "datasets:\n  musdb18hq_path: /file/musdb\n  medleydb_path: /file/medley\noutput: /file/out\nprofile: vdbo+gp\nworkers: 8\ninclude_bleed: true\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "mss-datasets",
            "--medleydb-path",
            "/cli/medley",
            "--profile",
            "vdbo",
            "-j",
            "2",
        ])
        .unwrap();

        let settings = Settings::merge(&cli, &file).unwrap();
        assert_eq!(settings.musdb18hq_path, Some(PathBuf::from("/file/musdb")));
        assert_eq!(settings.medleydb_path, Some(PathBuf::from("/cli/medley")));
        assert_eq!(settings.output, PathBuf::from("/file/out"));
        assert_eq!(settings.profile, ProfileKind::Vdbo);
        assert_eq!(settings.workers, 2);
        assert!(settings.include_bleed);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_dataset_sources_order_and_overrides() {
        let settings = Settings {
            moisesdb_path: Some(PathBuf::from("/m")),
            medleydb_path: Some(PathBuf::from("/d")),
            musdb18hq_path: Some(PathBuf::from("/s")),
            medleydb_overrides: Some(PathBuf::from("/o.yaml")),
            ..Settings::default()
        };

        let sources = settings.dataset_sources();
        let kinds: Vec<_> = sources.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![DatasetKind::Musdb18hq, DatasetKind::Medleydb, DatasetKind::Moisesdb]
        );
        assert_eq!(sources[1].overrides, Some(PathBuf::from("/o.yaml")));
        assert_eq!(sources[0].overrides, None);
    }

    #[test]
    fn test_zero_workers_means_all_cpus() {
        let settings = Settings {
            workers: 0,
            ..Settings::default()
        };
        assert_eq!(settings.effective_workers(), num_cpus::get().max(1));
    }
}
