//! svnmerge core library.
//!
//! Merges revisions from an SVN source into a working copy one at a time,
//! resolves the conflicts each merge leaves according to fixed policy,
//! reverts changes under ignored paths, and records every decision in a
//! timestamped run log.

pub mod commit_message;
pub mod config;
pub mod context;
pub mod errors;
pub mod gateway;
pub mod ignore;
pub mod merge;
pub mod models;
pub mod revisions;
pub mod run_log;
pub mod session;
pub mod svn;

// Re-exports for convenience.
pub use config::MergeConfig;
pub use context::RunContext;
pub use errors::CoreError;
pub use gateway::VcsGateway;
pub use ignore::IgnoreMatcher;
pub use session::MergeSession;
pub use svn::SvnClient;
