//! Parallel processing orchestration and run reports

pub mod orchestrator;
pub mod report;

pub use orchestrator::{run, METADATA_DIR};
pub use report::{DryRunReport, RunReport, SummaryReport};
