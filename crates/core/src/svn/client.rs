//! Asynchronous SVN CLI client.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::parser::{
    parse_committed_revision, parse_eligible_revisions, parse_svn_info, parse_svn_log, SvnInfo,
};
use super::status::dirty_lines;
use crate::errors::SvnError;
use crate::gateway::{ActionOutcome, CommandOutput, VcsGateway};
use crate::models::{ConflictKind, Resolution};

/// Ceiling for each captured output stream of a single `svn` invocation.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Revisions requested per `svn log -c` call.
const LOG_CHUNK_SIZE: usize = 50;

/// Credentials passed to every `svn` invocation.
#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

/// Asynchronous client for driving an SVN working copy via the CLI.
#[derive(Debug, Clone, Default)]
pub struct SvnClient {
    credentials: Option<Credentials>,
    output_limit: Option<usize>,
}

impl SvnClient {
    /// Client that relies on the user's cached SVN credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that authenticates explicitly on every call.
    pub fn with_credentials(username: impl Into<String>, password: Option<String>) -> Self {
        let username = username.into();
        info!(username = %username, "created SvnClient with explicit credentials");
        Self {
            credentials: Some(Credentials { username, password }),
            output_limit: None,
        }
    }

    /// Override the per-stream output ceiling.
    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = Some(limit);
        self
    }

    fn limit(&self) -> usize {
        self.output_limit.unwrap_or(MAX_OUTPUT_BYTES)
    }

    /// Map a resolution to the `--accept` argument `svn resolve` understands.
    ///
    /// Tree conflicts only accept `working`.
    pub fn accept_arg(kind: ConflictKind, resolution: Resolution) -> &'static str {
        match (kind, resolution) {
            (_, Resolution::Incoming) => "theirs-full",
            (ConflictKind::Tree, Resolution::Local) => "working",
            (ConflictKind::Text | ConflictKind::Property, Resolution::Local) => "mine-full",
        }
    }

    /// Run `svn` and return raw output regardless of the exit status.
    async fn run_raw(&self, args: &[&str]) -> Result<CommandOutput, SvnError> {
        let mut cmd = Command::new("svn");
        cmd.args(args).arg("--non-interactive");
        if let Some(creds) = &self.credentials {
            cmd.arg("--no-auth-cache")
                .arg("--username")
                .arg(&creds.username);
            if let Some(password) = &creds.password {
                cmd.arg("--password").arg(password);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(cmd = ?format!("svn {}", args.join(" ")), "running svn command");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SvnError::BinaryNotFound("svn".into())
            } else {
                SvnError::IoError(e)
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.limit();
        let (stdout, stderr) = tokio::try_join!(
            read_capped(stdout, limit, "stdout"),
            read_capped(stderr, limit, "stderr"),
        )?;
        let status = child.wait().await?;

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    }

    /// Run `svn` and fail on a non-zero exit status.
    async fn run_svn(&self, args: &[&str]) -> Result<String, SvnError> {
        let output = self.run_raw(args).await?;
        if !output.success() {
            warn!(exit_code = output.exit_code, stderr = %output.stderr, "svn command failed");
            return Err(SvnError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

/// Read a child stream to the end, failing once it exceeds `limit` bytes.
async fn read_capped<R>(
    stream: Option<R>,
    limit: usize,
    name: &'static str,
) -> Result<String, SvnError>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    stream
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > limit {
        return Err(SvnError::OutputTooLarge {
            stream: name,
            limit,
        });
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl VcsGateway for SvnClient {
    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn merge(
        &self,
        revision: u64,
        source: &str,
        workspace: &Path,
    ) -> Result<CommandOutput, SvnError> {
        let rev = revision.to_string();
        let wc = path_arg(workspace);
        self.run_raw(&["merge", "-c", &rev, "--accept", "postpone", source, &wc])
            .await
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn status_report(&self, workspace: &Path) -> Result<String, SvnError> {
        let wc = path_arg(workspace);
        self.run_svn(&["status", &wc]).await
    }

    #[instrument(skip(self, _workspace))]
    async fn resolve_conflict(
        &self,
        path: &str,
        kind: ConflictKind,
        resolution: Resolution,
        _workspace: &Path,
    ) -> ActionOutcome {
        let accept = Self::accept_arg(kind, resolution);
        self.run_raw(&["resolve", "--accept", accept, path])
            .await
            .into()
    }

    #[instrument(skip(self, _workspace))]
    async fn revert_path(&self, path: &str, _workspace: &Path) -> ActionOutcome {
        self.run_raw(&["revert", "--depth", "infinity", path])
            .await
            .into()
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn eligible_revisions(
        &self,
        source: &str,
        workspace: &Path,
    ) -> Result<Vec<u64>, SvnError> {
        let wc = path_arg(workspace);
        let output = self
            .run_svn(&["mergeinfo", "--show-revs", "eligible", source, &wc])
            .await?;
        let revisions = parse_eligible_revisions(&output);
        info!(count = revisions.len(), "eligible revisions");
        Ok(revisions)
    }

    #[instrument(skip(self, revisions), fields(count = revisions.len()))]
    async fn log_messages(
        &self,
        revisions: &[u64],
        source: &str,
    ) -> Result<BTreeMap<u64, String>, SvnError> {
        let mut messages = BTreeMap::new();
        for chunk in revisions.chunks(LOG_CHUNK_SIZE) {
            let list = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let xml = self.run_svn(&["log", "--xml", "-c", &list, source]).await?;
            for entry in parse_svn_log(&xml)? {
                messages.insert(entry.revision, entry.message);
            }
        }
        debug!(found = messages.len(), "fetched log messages");
        Ok(messages)
    }

    async fn dirty_status_lines(&self, workspace: &Path) -> Result<Vec<String>, SvnError> {
        let wc = path_arg(workspace);
        let output = self.run_svn(&["status", "--ignore-externals", &wc]).await?;
        Ok(dirty_lines(&output))
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn update(&self, workspace: &Path) -> Result<(), SvnError> {
        let wc = path_arg(workspace);
        self.run_svn(&["update", &wc]).await?;
        info!("svn update completed");
        Ok(())
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn verify_working_copy(&self, workspace: &Path) -> Result<SvnInfo, SvnError> {
        let wc = path_arg(workspace);
        let xml = self
            .run_svn(&["info", "--xml", &wc])
            .await
            .map_err(|e| SvnError::WorkingCopyError {
                path: wc.clone(),
                detail: e.to_string(),
            })?;
        parse_svn_info(&xml)
    }

    #[instrument(skip(self, message), fields(workspace = %workspace.display()))]
    async fn commit(&self, workspace: &Path, message: &str) -> Result<u64, SvnError> {
        let wc = path_arg(workspace);
        let output = self.run_svn(&["commit", "-m", message, &wc]).await?;
        let rev = parse_committed_revision(&output).ok_or_else(|| SvnError::CommandFailed {
            exit_code: 0,
            stderr: format!("could not parse committed revision from: {}", output),
        })?;
        info!(rev, "svn commit succeeded");
        Ok(rev)
    }
}
