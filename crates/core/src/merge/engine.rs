//! Single-revision merge pipeline.
//!
//! `Started → MergeIssued → Fatal` when the merge could not run at all,
//! otherwise `MergeIssued → Classified → ConflictsResolved →
//! ModificationsReverted → Done`.
//!
//! Nothing that goes wrong for one revision escapes as an error: a fatal
//! merge, a rejected resolve and a rejected revert are all recorded on the
//! returned [`RevisionResult`]. Only failures writing the run log propagate.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::context::RunContext;
use crate::errors::RunLogError;
use crate::gateway::{CommandOutput, VcsGateway};
use crate::ignore::{display_relative, IgnoreMatcher};
use crate::models::{ConflictRecord, ModificationRecord, RevisionResult};
use crate::svn::classify_status;

/// Position of a revision in the merge pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    Started,
    MergeIssued,
    Fatal,
    Classified,
    ConflictsResolved,
    ModificationsReverted,
    Done,
}

impl MergeStage {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_advance_to(self, next: MergeStage) -> bool {
        use MergeStage::*;
        matches!(
            (self, next),
            (Started, MergeIssued)
                | (MergeIssued, Fatal)
                | (MergeIssued, Classified)
                | (Classified, ConflictsResolved)
                | (ConflictsResolved, ModificationsReverted)
                | (ModificationsReverted, Done)
        )
    }
}

impl std::fmt::Display for MergeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::MergeIssued => write!(f, "merge_issued"),
            Self::Fatal => write!(f, "fatal"),
            Self::Classified => write!(f, "classified"),
            Self::ConflictsResolved => write!(f, "conflicts_resolved"),
            Self::ModificationsReverted => write!(f, "modifications_reverted"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// How the raw merge output is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeVerdict {
    /// Exit 0 and nothing on stderr.
    Clean,
    /// Merge ran but something looked off (non-zero exit with output, or
    /// stderr noise). Logged as a warning, processing continues.
    Anomaly,
    /// Non-zero exit, empty stdout, non-empty stderr: the merge never ran.
    Fatal,
}

/// Classify raw merge output.
///
/// `svn merge` may exit non-zero after doing useful work (conflicts are
/// reported on stdout), so only the combination of a failed exit, nothing on
/// stdout and something on stderr is treated as fatal.
pub fn judge_merge_output(output: &CommandOutput) -> MergeVerdict {
    let stdout_empty = output.stdout.trim().is_empty();
    let stderr_empty = output.stderr.trim().is_empty();
    if output.exit_code != 0 && stdout_empty && !stderr_empty {
        MergeVerdict::Fatal
    } else if output.exit_code != 0 || !stderr_empty {
        MergeVerdict::Anomaly
    } else {
        MergeVerdict::Clean
    }
}

/// Merges one revision at a time into a working copy, applying conflict
/// and ignore policy.
pub struct RevisionMerger<'a, G: VcsGateway> {
    gateway: &'a G,
    source: &'a str,
    workspace: &'a Path,
    ignore: &'a IgnoreMatcher,
}

impl<'a, G: VcsGateway> RevisionMerger<'a, G> {
    pub fn new(
        gateway: &'a G,
        source: &'a str,
        workspace: &'a Path,
        ignore: &'a IgnoreMatcher,
    ) -> Self {
        Self {
            gateway,
            source,
            workspace,
            ignore,
        }
    }

    fn rel(&self, path: &str) -> String {
        display_relative(path, self.workspace)
    }

    fn advance(&self, revision: u64, stage: &mut MergeStage, next: MergeStage) {
        debug_assert!(
            stage.can_advance_to(next),
            "illegal merge stage transition {} -> {}",
            stage,
            next
        );
        debug!(revision, from = %stage, to = %next, "merge stage transition");
        *stage = next;
    }

    /// Merge `revision` and leave no ignore-covered conflict or modification
    /// behind.
    #[instrument(skip(self, ctx), fields(source = self.source))]
    pub async fn merge_revision(
        &self,
        revision: u64,
        ctx: &mut RunContext,
    ) -> Result<RevisionResult, RunLogError> {
        let mut stage = MergeStage::Started;
        ctx.log()
            .line(format!("r{}: merging from {}", revision, self.source))?;

        // 1. Merge.
        let merged = self.gateway.merge(revision, self.source, self.workspace).await;
        self.advance(revision, &mut stage, MergeStage::MergeIssued);
        let output = match merged {
            Ok(output) => output,
            Err(e) => {
                self.advance(revision, &mut stage, MergeStage::Fatal);
                warn!(revision, error = %e, "merge could not be started");
                ctx.log().line(format!("r{}: FAILED: {}", revision, e))?;
                return Ok(RevisionResult::failed(revision, e.to_string()));
            }
        };
        ctx.log().raw(&output.stdout)?;
        ctx.log().raw(&output.stderr)?;

        // 2. Fatal or not.
        match judge_merge_output(&output) {
            MergeVerdict::Fatal => {
                self.advance(revision, &mut stage, MergeStage::Fatal);
                let message = output.stderr.trim().to_string();
                warn!(revision, exit_code = output.exit_code, "merge failed");
                ctx.log().line(format!(
                    "r{}: FAILED (exit {}): {}",
                    revision, output.exit_code, message
                ))?;
                return Ok(RevisionResult::failed(revision, message));
            }
            MergeVerdict::Anomaly => {
                warn!(
                    revision,
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "merge reported problems; continuing"
                );
                ctx.log().line(format!(
                    "r{}: warning: merge exited {} with diagnostics; continuing",
                    revision, output.exit_code
                ))?;
            }
            MergeVerdict::Clean => {}
        }

        // 3. Classify.
        let report = match self.gateway.status_report(self.workspace).await {
            Ok(report) => report,
            Err(e) => {
                self.advance(revision, &mut stage, MergeStage::Fatal);
                warn!(revision, error = %e, "status query failed after merge");
                let message = format!("status query failed after merge: {}", e);
                ctx.log().line(format!("r{}: FAILED: {}", revision, message))?;
                return Ok(RevisionResult::failed(revision, message));
            }
        };
        let classified = classify_status(&report, self.workspace);
        self.advance(revision, &mut stage, MergeStage::Classified);

        // 4. Resolve.
        let mut conflicts = Vec::with_capacity(classified.conflicts.len());
        for conflict in classified.conflicts {
            let resolved = self.resolve(revision, conflict, ctx).await?;
            conflicts.push(resolved);
        }
        self.advance(revision, &mut stage, MergeStage::ConflictsResolved);

        // 5. Revert ignored modifications not already handled as conflicts.
        let handled: HashSet<&str> = conflicts.iter().map(|c| c.path.as_str()).collect();
        let mut reverted = Vec::new();
        for modification in classified.modifications {
            if handled.contains(modification.path.as_str()) {
                continue;
            }
            let Some(rule) = self.ignore.matching_rule(&modification.path, self.workspace) else {
                continue;
            };
            if let Some(done) = self.revert(revision, modification, rule, ctx).await? {
                reverted.push(done);
            }
        }
        self.advance(revision, &mut stage, MergeStage::ModificationsReverted);

        let result = RevisionResult::merged(revision, conflicts, reverted);
        ctx.log().line(format!(
            "r{}: done ({}; {} conflict(s), {} reverted)",
            revision,
            result.outcome(),
            result.conflicts.len(),
            result.reverted.len()
        ))?;
        self.advance(revision, &mut stage, MergeStage::Done);
        info!(
            revision,
            outcome = %result.outcome(),
            conflicts = result.conflicts.len(),
            reverted = result.reverted.len(),
            "revision merged"
        );
        Ok(result)
    }

    /// Apply ignore policy to one conflict and issue the resolve call.
    async fn resolve(
        &self,
        revision: u64,
        conflict: ConflictRecord,
        ctx: &mut RunContext,
    ) -> Result<ConflictRecord, RunLogError> {
        let rule = self.ignore.matching_rule(&conflict.path, self.workspace);
        let mut conflict = match rule {
            Some(_) => conflict.into_ignored(),
            None => conflict,
        };
        let rel = self.rel(&conflict.path);
        let why = match rule {
            Some(rule) => format!(" (ignored by '{}')", rule),
            None => String::new(),
        };

        let outcome = self
            .gateway
            .resolve_conflict(
                &conflict.path,
                conflict.kind,
                conflict.resolution,
                self.workspace,
            )
            .await;

        if outcome.success {
            debug!(revision, path = %rel, kind = %conflict.kind, resolution = %conflict.resolution, "conflict resolved");
            ctx.log().line(format!(
                "r{}: {} conflict {} resolved as {}{}",
                revision, conflict.kind, rel, conflict.resolution, why
            ))?;
        } else {
            let message = outcome.message.trim().to_string();
            warn!(revision, path = %rel, kind = %conflict.kind, resolution = %conflict.resolution, error = %message, "resolve failed");
            ctx.log().line(format!(
                "r{}: {} conflict {} could NOT be resolved as {}{}",
                revision, conflict.kind, rel, conflict.resolution, why
            ))?;
            ctx.log().raw(&message)?;
            conflict.resolve_error = Some(message);
        }
        Ok(conflict)
    }

    /// Revert one ignored modification. Returns the record on success.
    async fn revert(
        &self,
        revision: u64,
        modification: ModificationRecord,
        rule: &str,
        ctx: &mut RunContext,
    ) -> Result<Option<ModificationRecord>, RunLogError> {
        let rel = self.rel(&modification.path);
        let outcome = self
            .gateway
            .revert_path(&modification.path, self.workspace)
            .await;
        if outcome.success {
            debug!(revision, path = %rel, rule, "reverted ignored modification");
            ctx.log()
                .line(format!("r{}: reverted {} (ignored by '{}')", revision, rel, rule))?;
            Ok(Some(modification))
        } else {
            let message = outcome.message.trim().to_string();
            warn!(revision, path = %rel, error = %message, "revert failed");
            ctx.log()
                .line(format!("r{}: revert of {} FAILED", revision, rel))?;
            ctx.log().raw(&message)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(stdout: &str, stderr: &str, exit_code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    #[test]
    fn test_fatal_requires_all_three_conditions() {
        assert_eq!(
            judge_merge_output(&out("", "svn: E195012: Unable to find repository location", 1)),
            MergeVerdict::Fatal
        );
        // Non-zero exit but stdout shows work was done.
        assert_eq!(
            judge_merge_output(&out("--- Merging r5 into '.':\nC    a.txt\n", "svn: E155015", 1)),
            MergeVerdict::Anomaly
        );
        // Non-zero exit, nothing at all on stderr.
        assert_eq!(judge_merge_output(&out("", "", 1)), MergeVerdict::Anomaly);
        // Successful exit with informational stderr.
        assert_eq!(
            judge_merge_output(&out("--- Merging r5\n", "svn: warning: W200017", 0)),
            MergeVerdict::Anomaly
        );
        assert_eq!(judge_merge_output(&out("", "  \n", 0)), MergeVerdict::Clean);
        assert_eq!(judge_merge_output(&out("U    a.txt\n", "", 0)), MergeVerdict::Clean);
    }

    #[test]
    fn test_stage_transitions() {
        use MergeStage::*;
        let happy = [Started, MergeIssued, Classified, ConflictsResolved, ModificationsReverted, Done];
        for pair in happy.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(MergeIssued.can_advance_to(Fatal));
        // No skipping ahead, no leaving a terminal stage.
        assert!(!Started.can_advance_to(Classified));
        assert!(!Classified.can_advance_to(Fatal));
        assert!(!Done.can_advance_to(Started));
        assert!(!Fatal.can_advance_to(Classified));
    }
}
