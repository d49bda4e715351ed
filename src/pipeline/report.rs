//! Run reports returned by [`super::run`]

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a completed aggregation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub profile: String,
    /// Selected tracks, the same count a dry run reports
    pub total_tracks: usize,
    /// WAV files per profile category, counted recursively
    pub stem_counts: BTreeMap<String, usize>,
    pub total_files: usize,
    pub disk_usage_bytes: u64,
    pub errors: usize,
    pub skipped_musdb_overlap: usize,
    pub excluded_bleed: usize,
}

/// What a run would do, computed without touching the output root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunReport {
    pub profile: String,
    pub total_tracks: usize,
    pub by_dataset: BTreeMap<String, usize>,
    pub by_split: BTreeMap<String, usize>,
    pub skipped_musdb_overlap: usize,
    pub excluded_bleed: usize,
    pub stem_folders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunReport {
    Summary(SummaryReport),
    DryRun(DryRunReport),
}

impl RunReport {
    pub fn summary(&self) -> Option<&SummaryReport> {
        match self {
            RunReport::Summary(summary) => Some(summary),
            RunReport::DryRun(_) => None,
        }
    }

    pub fn dry_run(&self) -> Option<&DryRunReport> {
        match self {
            RunReport::DryRun(report) => Some(report),
            RunReport::Summary(_) => None,
        }
    }
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MSS Datasets - Complete")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Profile: {}", self.profile)?;
        writeln!(f, "Total tracks: {}", self.total_tracks)?;
        if self.skipped_musdb_overlap > 0 {
            writeln!(
                f,
                "Deduplicated: {} tracks (MedleyDB preferred)",
                self.skipped_musdb_overlap
            )?;
        }
        if self.excluded_bleed > 0 {
            writeln!(f, "Excluded (bleed): {} tracks", self.excluded_bleed)?;
        }
        writeln!(f, "Errors: {} (see metadata/errors.json)", self.errors)?;
        writeln!(f)?;
        writeln!(f, "Output stem counts:")?;
        for (stem, count) in &self.stem_counts {
            writeln!(f, "  {:12} {} files", format!("{}/", stem), count)?;
        }
        writeln!(f)?;
        writeln!(f, "Total: {} WAV files", self.total_files)?;

        let mb = self.disk_usage_bytes as f64 / (1024.0 * 1024.0);
        if mb > 1024.0 {
            write!(f, "Disk usage: ~{:.1} GB", mb / 1024.0)
        } else {
            write!(f, "Disk usage: ~{:.0} MB", mb)
        }
    }
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MSS Datasets - Dry Run")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Profile: {}", self.profile)?;
        writeln!(f, "Total tracks: {}", self.total_tracks)?;
        writeln!(f, "Skipped (overlap): {}", self.skipped_musdb_overlap)?;
        if self.excluded_bleed > 0 {
            writeln!(f, "Excluded (bleed): {}", self.excluded_bleed)?;
        }
        writeln!(f)?;
        writeln!(f, "By dataset: {}", format_counts(&self.by_dataset))?;
        writeln!(f, "By split: {}", format_counts(&self.by_split))?;
        write!(f, "Stem folders: {}", self.stem_folders.join(", "))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Summary(summary) => fmt::Display::fmt(summary, f),
            RunReport::DryRun(report) => fmt::Display::fmt(report, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let report = SummaryReport {
            profile: "vdbo".to_string(),
            total_tracks: 3,
            stem_counts: [("vocals".to_string(), 3)].into_iter().collect(),
            total_files: 3,
            disk_usage_bytes: 5 * 1024 * 1024,
            errors: 0,
            skipped_musdb_overlap: 1,
            excluded_bleed: 0,
        };
        let text = RunReport::Summary(report).to_string();
        assert!(text.contains("Total tracks: 3"));
        assert!(text.contains("Deduplicated: 1 tracks"));
        assert!(text.contains("vocals/"));
        assert!(text.contains("~5 MB"));
        assert!(!text.contains("bleed"));
    }

    #[test]
    fn test_dry_run_display() {
        let report = DryRunReport {
            profile: "vdbo+gp".to_string(),
            total_tracks: 2,
            by_dataset: [("musdb18hq".to_string(), 2)].into_iter().collect(),
            by_split: [("train".to_string(), 1), ("test".to_string(), 1)]
                .into_iter()
                .collect(),
            skipped_musdb_overlap: 0,
            excluded_bleed: 0,
            stem_folders: vec!["vocals".to_string(), "other".to_string()],
        };
        let text = report.to_string();
        assert!(text.contains("By split: test: 1, train: 1"));
        assert!(text.contains("Stem folders: vocals, other"));
    }
}
