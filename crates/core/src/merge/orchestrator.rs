//! Sequences the revision merge engine over an ordered revision list.

use tracing::{info, instrument, warn};

use super::engine::RevisionMerger;
use crate::context::RunContext;
use crate::errors::RunLogError;
use crate::gateway::VcsGateway;
use crate::models::OutcomeClass;

/// Progress notification emitted after each revision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 1-based position of the revision in the run.
    pub index: usize,
    pub total: usize,
    pub percent: f64,
    pub revision: u64,
    pub outcome: OutcomeClass,
}

impl Progress {
    pub fn new(index: usize, total: usize, revision: u64, outcome: OutcomeClass) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            index as f64 * 100.0 / total as f64
        };
        Self {
            index,
            total,
            percent,
            revision,
            outcome,
        }
    }
}

/// Receives per-revision progress from a run.
pub trait ProgressReporter {
    /// Called before revision `index` (1-based) of `total` is merged.
    fn on_revision_start(&mut self, _index: usize, _total: usize, _revision: u64) {}

    fn on_revision_done(&mut self, progress: &Progress);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_revision_done(&mut self, _progress: &Progress) {}
}

/// Runs a list of revisions through a [`RevisionMerger`] in input order.
pub struct RunOrchestrator<'a, G: VcsGateway> {
    merger: RevisionMerger<'a, G>,
}

impl<'a, G: VcsGateway> RunOrchestrator<'a, G> {
    pub fn new(merger: RevisionMerger<'a, G>) -> Self {
        Self { merger }
    }

    /// Merge every revision in order, recording each result in `ctx`.
    ///
    /// A failed revision never stops the loop. Only a run-log write failure
    /// aborts the run.
    #[instrument(skip_all, fields(total = revisions.len()))]
    pub async fn run<R: ProgressReporter>(
        &self,
        ctx: &mut RunContext,
        revisions: &[u64],
        reporter: &mut R,
    ) -> Result<(), RunLogError> {
        let total = revisions.len();
        ctx.log().line(format!(
            "merging {} revision(s): {}",
            total,
            revisions
                .iter()
                .map(|r| format!("r{}", r))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        for (i, &revision) in revisions.iter().enumerate() {
            let index = i + 1;
            reporter.on_revision_start(index, total, revision);

            let result = self.merger.merge_revision(revision, ctx).await?;
            let outcome = result.outcome();
            if outcome == OutcomeClass::Failed {
                warn!(revision, index, total, "revision failed; continuing with the next one");
            }
            ctx.record(result);

            let progress = Progress::new(index, total, revision, outcome);
            ctx.log().line(format!(
                "progress: {}/{} ({:.0}%) r{} {}",
                index, total, progress.percent, revision, outcome
            ))?;
            reporter.on_revision_done(&progress);
        }

        let s = ctx.summary();
        info!(
            total = s.total,
            succeeded = s.succeeded,
            with_conflicts = s.with_conflicts,
            failed = s.failed,
            "run complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let p = Progress::new(1, 4, 10, OutcomeClass::Clean);
        assert_eq!(p.percent, 25.0);
        let p = Progress::new(4, 4, 13, OutcomeClass::Failed);
        assert_eq!(p.percent, 100.0);
        let p = Progress::new(0, 0, 0, OutcomeClass::Clean);
        assert_eq!(p.percent, 100.0);
    }
}
