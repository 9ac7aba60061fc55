//! The version-control seam used by the merge pipeline.
//!
//! [`crate::svn::SvnClient`] is the production implementation; tests drive
//! the pipeline with scripted implementations.
//!
//! Every call is awaited to completion before the pipeline issues the next
//! one, so a working copy never sees two concurrent operations.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SvnError;
use crate::models::{ConflictKind, Resolution};
use crate::svn::SvnInfo;

/// Raw result of running a command whose exit status is interpreted by the
/// caller rather than the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a per-path action (resolve, revert) that must not abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<CommandOutput, SvnError>> for ActionOutcome {
    fn from(result: Result<CommandOutput, SvnError>) -> Self {
        match result {
            Ok(out) if out.success() => Self::ok(out.stdout),
            Ok(out) => {
                let message = if out.stderr.trim().is_empty() {
                    out.stdout
                } else {
                    out.stderr
                };
                Self::failed(message)
            }
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Operations the merge pipeline needs from the version-control tool.
#[allow(async_fn_in_trait)]
pub trait VcsGateway {
    /// Merge exactly one revision of `source` into `workspace`, postponing
    /// every conflict.
    async fn merge(
        &self,
        revision: u64,
        source: &str,
        workspace: &Path,
    ) -> Result<CommandOutput, SvnError>;

    /// Full recursive status report of the working copy.
    async fn status_report(&self, workspace: &Path) -> Result<String, SvnError>;

    /// Mark a conflicted path resolved, keeping the chosen side.
    async fn resolve_conflict(
        &self,
        path: &str,
        kind: ConflictKind,
        resolution: Resolution,
        workspace: &Path,
    ) -> ActionOutcome;

    /// Revert a path, recursively for directories.
    async fn revert_path(&self, path: &str, workspace: &Path) -> ActionOutcome;

    /// Revisions of `source` not yet merged into `workspace`, ascending.
    async fn eligible_revisions(&self, source: &str, workspace: &Path)
        -> Result<Vec<u64>, SvnError>;

    /// Log message per revision. Revisions without a message may be absent.
    async fn log_messages(
        &self,
        revisions: &[u64],
        source: &str,
    ) -> Result<BTreeMap<u64, String>, SvnError>;

    /// Non-clean, non-external status lines.
    async fn dirty_status_lines(&self, workspace: &Path) -> Result<Vec<String>, SvnError>;

    async fn update(&self, workspace: &Path) -> Result<(), SvnError>;

    async fn verify_working_copy(&self, workspace: &Path) -> Result<SvnInfo, SvnError>;

    /// Commit the working copy and return the new revision.
    async fn commit(&self, workspace: &Path, message: &str) -> Result<u64, SvnError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_outcome_from_command_output() {
        let ok: ActionOutcome = Ok(CommandOutput {
            stdout: "Resolved conflicted state of 'a.txt'\n".into(),
            stderr: String::new(),
            exit_code: 0,
        })
        .into();
        assert!(ok.success);

        let failed: ActionOutcome = Ok(CommandOutput {
            stdout: String::new(),
            stderr: "svn: E155027: Tree conflict can only be resolved to 'working' state".into(),
            exit_code: 1,
        })
        .into();
        assert!(!failed.success);
        assert!(failed.message.contains("E155027"));

        let spawn_err: ActionOutcome = Err(SvnError::BinaryNotFound("svn".into())).into();
        assert!(!spawn_err.success);
        assert!(spawn_err.message.contains("not found"));
    }
}
