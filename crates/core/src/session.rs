//! A complete merge session: pre-run checks, the run itself, artifacts and
//! the optional commit.
//!
//! ```text
//! prepare ──► (dry run) preview
//!    │
//!    └──────► run ──► commit-message.txt, summary.json ──► auto-commit
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::commit_message::CommitMessageBuilder;
use crate::config::MergeConfig;
use crate::context::RunContext;
use crate::errors::{CoreError, RunLogError};
use crate::gateway::VcsGateway;
use crate::ignore::IgnoreMatcher;
use crate::merge::{ProgressReporter, RevisionMerger, RunOrchestrator, SummaryView};
use crate::models::RunSummary;
use crate::svn::SvnInfo;

pub const COMMIT_MESSAGE_FILE: &str = "commit-message.txt";
pub const SUMMARY_FILE: &str = "summary.json";

/// How the revision list is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSource {
    /// Everything `svn mergeinfo` reports as eligible.
    Eligible,
    /// An explicit list, merged in the given order.
    Explicit(Vec<u64>),
}

/// Everything known before the first revision is merged.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub info: SvnInfo,
    /// Uncommitted changes found in the working copy before the run.
    pub dirty: Vec<String>,
    pub revisions: Vec<u64>,
    pub messages: BTreeMap<u64, String>,
}

impl MergePlan {
    /// Log message for `revision`, empty when the log had none.
    pub fn message(&self, revision: u64) -> &str {
        self.messages.get(&revision).map(String::as_str).unwrap_or("")
    }
}

/// What happened to the post-run commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Disabled,
    Skipped { reason: String },
    Committed { revision: u64 },
    Failed { error: String },
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub view: SummaryView,
    pub log_path: PathBuf,
    /// Written only when at least one revision merged.
    pub commit_message_path: Option<PathBuf>,
    pub summary_path: PathBuf,
    pub commit: CommitOutcome,
}

impl RunOutcome {
    /// Whether the process should report failure.
    pub fn is_failure(&self) -> bool {
        self.summary.has_failures() || matches!(self.commit, CommitOutcome::Failed { .. })
    }
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    workspace: String,
    source: &'a str,
    ignore_paths: &'a [String],
    summary: &'a RunSummary,
    grouped: &'a SummaryView,
    commit: &'a CommitOutcome,
}

/// Write an artifact into `dir`, creating it when needed.
fn write_artifact(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, RunLogError> {
    let path = dir.join(name);
    let write_err = |source| RunLogError::Write {
        path: path.display().to_string(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    std::fs::write(&path, contents).map_err(write_err)?;
    info!(path = %path.display(), "wrote artifact");
    Ok(path)
}

/// Drives one merge session against a gateway.
pub struct MergeSession<G: VcsGateway> {
    gateway: G,
    config: MergeConfig,
    ignore: IgnoreMatcher,
}

impl<G: VcsGateway> MergeSession<G> {
    pub fn new(gateway: G, config: MergeConfig) -> Self {
        let ignore = config.ignore_matcher();
        Self {
            gateway,
            config,
            ignore,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn workspace(&self) -> &Path {
        &self.config.merge.workspace
    }

    fn source(&self) -> &str {
        &self.config.merge.source
    }

    /// Pre-run checks and planning.
    ///
    /// `confirm` is consulted only when the working copy has uncommitted
    /// changes; returning `false` aborts with `Ok(None)` before anything is
    /// touched. The working copy is updated unless `dry_run` is set.
    #[instrument(skip(self, confirm), fields(workspace = %self.workspace().display()))]
    pub async fn prepare<F>(
        &self,
        revisions: RevisionSource,
        dry_run: bool,
        confirm: F,
    ) -> Result<Option<MergePlan>, CoreError>
    where
        F: FnOnce(&[String]) -> bool,
    {
        let info = self.gateway.verify_working_copy(self.workspace()).await?;
        info!(url = %info.url, revision = info.revision, "working copy verified");

        let dirty = self.gateway.dirty_status_lines(self.workspace()).await?;
        if !dirty.is_empty() {
            warn!(count = dirty.len(), "working copy has uncommitted changes");
            if !confirm(&dirty) {
                info!("merge declined by user");
                return Ok(None);
            }
        }

        if !dry_run {
            self.gateway.update(self.workspace()).await?;
        }

        let revisions = match revisions {
            RevisionSource::Explicit(list) => list,
            RevisionSource::Eligible => {
                self.gateway
                    .eligible_revisions(self.source(), self.workspace())
                    .await?
            }
        };

        // Log bodies only feed the commit message.
        let messages = if revisions.is_empty() {
            BTreeMap::new()
        } else {
            match self.gateway.log_messages(&revisions, self.source()).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(error = %e, "could not fetch log messages");
                    BTreeMap::new()
                }
            }
        };
        info!(count = revisions.len(), "merge plan ready");

        Ok(Some(MergePlan {
            info,
            dirty,
            revisions,
            messages,
        }))
    }

    /// Commit message for `revisions` using the plan's log bodies.
    pub fn commit_message(&self, plan: &MergePlan, revisions: &[u64]) -> String {
        CommitMessageBuilder::new(self.source(), &plan.messages).build(revisions)
    }

    /// Dry run: write the commit message every planned revision would get.
    pub fn preview(&self, plan: &MergePlan) -> Result<PathBuf, CoreError> {
        let message = self.commit_message(plan, &plan.revisions);
        let path = write_artifact(&self.config.merge.output_dir, COMMIT_MESSAGE_FILE, &message)?;
        Ok(path)
    }

    /// Merge every planned revision, write the artifacts, and commit when
    /// configured to.
    #[instrument(skip_all, fields(revisions = plan.revisions.len()))]
    pub async fn run<R: ProgressReporter>(
        &self,
        plan: &MergePlan,
        reporter: &mut R,
    ) -> Result<RunOutcome, CoreError> {
        let output_dir = &self.config.merge.output_dir;
        let mut ctx = RunContext::open(output_dir)?;
        ctx.log().line(format!(
            "workspace {} at r{} ({})",
            self.workspace().display(),
            plan.info.revision,
            plan.info.url
        ))?;
        ctx.log().line(format!("source {}", self.source()))?;
        if self.ignore.is_empty() {
            ctx.log().line("ignore paths: none")?;
        } else {
            ctx.log()
                .line(format!("ignore paths: {}", self.ignore.rules().join(", ")))?;
        }
        for line in &plan.dirty {
            ctx.log().line(format!("pre-existing change: {}", line))?;
        }

        let merger = RevisionMerger::new(&self.gateway, self.source(), self.workspace(), &self.ignore);
        RunOrchestrator::new(merger)
            .run(&mut ctx, &plan.revisions, reporter)
            .await?;

        let merged = ctx.summary().merged_revisions();
        let message = (!merged.is_empty()).then(|| self.commit_message(plan, &merged));
        let commit_message_path = match &message {
            Some(message) => {
                let path = write_artifact(output_dir, COMMIT_MESSAGE_FILE, message)?;
                ctx.log()
                    .line(format!("commit message written to {}", path.display()))?;
                Some(path)
            }
            None => None,
        };

        let commit = self.auto_commit(&mut ctx, message.as_deref()).await?;

        let log_path = ctx.log_path().to_path_buf();
        let summary = ctx.close()?;
        let view = SummaryView::build(&summary.results, self.workspace());

        let document = SummaryDocument {
            workspace: self.workspace().display().to_string(),
            source: self.source(),
            ignore_paths: self.ignore.rules(),
            summary: &summary,
            grouped: &view,
            commit: &commit,
        };
        let json = serde_json::to_string_pretty(&document).map_err(RunLogError::from)?;
        let summary_path = write_artifact(output_dir, SUMMARY_FILE, &json)?;

        Ok(RunOutcome {
            summary,
            view,
            log_path,
            commit_message_path,
            summary_path,
            commit,
        })
    }

    /// Commit when enabled, nothing failed and something merged.
    async fn auto_commit(
        &self,
        ctx: &mut RunContext,
        message: Option<&str>,
    ) -> Result<CommitOutcome, RunLogError> {
        if !self.config.merge.auto_commit {
            return Ok(CommitOutcome::Disabled);
        }
        let failed = ctx.summary().failed;
        let message = match message {
            _ if failed > 0 => Err(format!("{} revision(s) failed", failed)),
            None => Err("no revision merged".to_string()),
            Some(message) => Ok(message),
        };
        let message = match message {
            Ok(message) => message,
            Err(reason) => {
                warn!(%reason, "auto-commit skipped");
                ctx.log().line(format!("auto-commit skipped: {}", reason))?;
                return Ok(CommitOutcome::Skipped { reason });
            }
        };

        match self.gateway.commit(self.workspace(), message).await {
            Ok(revision) => {
                info!(revision, "auto-commit succeeded");
                ctx.log().line(format!("committed r{}", revision))?;
                Ok(CommitOutcome::Committed { revision })
            }
            Err(e) => {
                error!(error = %e, "auto-commit failed");
                ctx.log().line(format!("auto-commit FAILED: {}", e))?;
                Ok(CommitOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }
}
