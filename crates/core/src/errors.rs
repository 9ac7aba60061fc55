//! Error types for the svnmerge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Per-revision and per-item failures (a merge that could not run, a resolve
//! or revert that was rejected) are *not* represented here: they are captured
//! as data on [`crate::models::RevisionResult`] so a run can continue past
//! them. The errors below are the ones that abort a whole run.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Svn(#[from] SvnError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    RevisionSpec(#[from] RevisionSpecError),

    #[error(transparent)]
    RunLog(#[from] RunLogError),
}

// ---------------------------------------------------------------------------
// SVN errors
// ---------------------------------------------------------------------------

/// Errors from SVN CLI operations.
#[derive(Debug, Error)]
pub enum SvnError {
    /// The `svn` binary was not found on `$PATH`.
    #[error("svn binary not found: {0}")]
    BinaryNotFound(String),

    /// An `svn` command exited with a non-zero status.
    #[error("svn command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// A stream produced by `svn` exceeded the buffer ceiling.
    #[error("svn {stream} exceeded {limit} bytes")]
    OutputTooLarge { stream: &'static str, limit: usize },

    /// Could not parse the XML output produced by `svn`.
    #[error("failed to parse svn XML output: {0}")]
    XmlParseError(String),

    /// The path is not an SVN working copy.
    #[error("svn working copy error at '{path}': {detail}")]
    WorkingCopyError { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("svn I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading or writing the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Revision list errors
// ---------------------------------------------------------------------------

/// Errors from parsing a user-supplied revision list such as `1,3-5,10`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevisionSpecError {
    #[error("revision list is empty")]
    Empty,

    #[error("invalid revision '{0}'")]
    InvalidRevision(String),

    #[error("revision numbers start at 1 (got '{0}')")]
    Zero(String),

    #[error("reversed revision range '{0}' (start must not exceed end)")]
    ReversedRange(String),

    #[error("revision range '{range}' spans more than {max} revisions")]
    RangeTooLarge { range: String, max: u64 },
}

// ---------------------------------------------------------------------------
// Run artifact errors
// ---------------------------------------------------------------------------

/// Errors writing the run log or the end-of-run artifacts.
#[derive(Debug, Error)]
pub enum RunLogError {
    /// The run log is not open (already closed).
    #[error("run log is closed")]
    Closed,

    /// Failed to create or append to an artifact file.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the run summary.
    #[error("failed to serialize run summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = SvnError::CommandFailed {
            exit_code: 1,
            stderr: "E155004: Working copy locked".into(),
        };
        assert_eq!(
            err.to_string(),
            "svn command failed (exit 1): E155004: Working copy locked"
        );

        let err = SvnError::OutputTooLarge {
            stream: "stdout",
            limit: 10,
        };
        assert_eq!(err.to_string(), "svn stdout exceeded 10 bytes");

        let err = RevisionSpecError::ReversedRange("9-3".into());
        assert!(err.to_string().contains("9-3"));

        let err = ConfigError::InvalidValue {
            field: "merge.source".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("merge.source"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = SvnError::BinaryNotFound("svn".into()).into();
        assert!(matches!(core_err, CoreError::Svn(_)));

        let core_err: CoreError = RunLogError::Closed.into();
        assert!(matches!(core_err, CoreError::RunLog(_)));

        let core_err: CoreError = RevisionSpecError::Empty.into();
        assert!(matches!(core_err, CoreError::RevisionSpec(_)));
    }
}
