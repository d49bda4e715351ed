//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// mss-datasets - Aggregate music source separation datasets
///
/// Merges MUSDB18-HQ, MedleyDB and MoisesDB into one folder per stem
/// category, with deduplication, reproducible splits and provenance
/// manifests. Re-running resumes an interrupted aggregation.
#[derive(Parser, Debug, Default)]
#[command(name = "mss-datasets")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the MUSDB18-HQ root (contains train/ and test/)
    #[arg(long, value_name = "DIR")]
    pub musdb18hq_path: Option<PathBuf>,

    /// Path to the MoisesDB root
    #[arg(long, value_name = "DIR")]
    pub moisesdb_path: Option<PathBuf>,

    /// Path to the MedleyDB root (contains Audio/)
    #[arg(long, value_name = "DIR")]
    pub medleydb_path: Option<PathBuf>,

    /// Output directory [default: ./output]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output stem profile [default: vdbo]
    #[arg(long, value_name = "PROFILE")]
    #[arg(value_parser = ["vdbo", "vdbo+gp"])]
    pub profile: Option<String>,

    /// Number of worker threads, 0 for one per CPU [default: 1]
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Also write a full mixture per track
    #[arg(long, default_value = "false")]
    pub include_mixtures: bool,

    /// Nest output under <category>/<dataset>/
    #[arg(long, default_value = "false")]
    pub group_by_dataset: bool,

    /// Keep tracks flagged with stem bleed
    #[arg(long, default_value = "false")]
    pub include_bleed: bool,

    /// YAML file with MedleyDB track/stem exclusions and reroutes
    #[arg(long, value_name = "FILE")]
    pub medleydb_overrides: Option<PathBuf>,

    /// Dry run - report what would be aggregated without writing anything
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// YAML config file (command-line values take precedence)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Log filter directive based on verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "mss-datasets",
            "--musdb18hq-path",
            "/data/musdb",
            "-o",
            "/out",
            "--profile",
            "vdbo+gp",
            "-j",
            "4",
            "--group-by-dataset",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.musdb18hq_path, Some(PathBuf::from("/data/musdb")));
        assert_eq!(cli.output, Some(PathBuf::from("/out")));
        assert_eq!(cli.profile.as_deref(), Some("vdbo+gp"));
        assert_eq!(cli.workers, Some(4));
        assert!(cli.group_by_dataset);
        assert!(!cli.include_bleed);
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_rejects_unknown_profile() {
        assert!(Cli::try_parse_from(["mss-datasets", "--profile", "vdbogp"]).is_err());
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        let cli = Cli::try_parse_from(["mss-datasets", "-q", "-vvv"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
    }
}
