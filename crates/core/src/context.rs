//! Per-run state shared by the orchestrator and the revision merge engine.
//!
//! A [`RunContext`] is opened at run start and closed at run end. It owns
//! the run log and the accumulating [`RunSummary`]; nothing else in the
//! process holds either.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::RunLogError;
use crate::models::{RevisionResult, RunSummary};
use crate::run_log::{log_file_name, RunLog};

#[derive(Debug)]
pub struct RunContext {
    log: RunLog,
    summary: RunSummary,
}

impl RunContext {
    /// Open a context whose log lives in `output_dir` under a timestamped
    /// name.
    pub fn open(output_dir: &Path) -> Result<Self, RunLogError> {
        Self::open_at(output_dir.join(log_file_name()))
    }

    /// Open a context logging to an explicit file.
    pub fn open_at(log_path: impl Into<PathBuf>) -> Result<Self, RunLogError> {
        let log = RunLog::open(log_path)?;
        Ok(Self {
            log,
            summary: RunSummary::new(),
        })
    }

    pub fn log(&mut self) -> &mut RunLog {
        &mut self.log
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn record(&mut self, result: RevisionResult) {
        self.summary.record(result);
    }

    /// Write the closing totals, release the log, and hand back the summary.
    pub fn close(mut self) -> Result<RunSummary, RunLogError> {
        let s = &self.summary;
        let totals = format!(
            "run finished: {} revision(s), {} clean, {} with conflicts, {} failed",
            s.total, s.succeeded, s.with_conflicts, s.failed
        );
        self.log.line(&totals)?;
        self.log.close()?;
        info!(
            total = s.total,
            succeeded = s.succeeded,
            with_conflicts = s.with_conflicts,
            failed = s.failed,
            "run context closed"
        );
        Ok(self.summary)
    }
}
