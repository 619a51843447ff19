use std::path::PathBuf;

use thiserror::Error;

/// Failure classes of a reporting run. The job layer decides per class whether a failure
/// aborts the run or is logged and swallowed.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("record store query failed: {0}")]
    SourceFetch(String),

    #[error("report artifact missing at {}", .0.display())]
    ReportArtifactMissing(PathBuf),

    #[error("weekly reset left records unpatched: {}", .failed_ids.join(", "))]
    ResetPartial { failed_ids: Vec<String> },

    #[error("reset requires at least one record")]
    EmptyRecordSet,

    #[error("record {0} has no week start date")]
    MissingWeekStart(String),
}
