//! svnmerge: merge SVN revisions one at a time with automatic conflict
//! policy.
//!
//! Without a subcommand the tool runs a merge session: verify the working
//! copy, confirm pre-existing changes, update, merge every requested
//! revision, then write the run log, commit message and summary.

mod init;
mod progress;
mod report;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::Confirm;
use tracing::info;
use tracing_subscriber::EnvFilter;

use svnmerge_core::config::{ConfigOverrides, MergeConfig};
use svnmerge_core::revisions::{compress_ranges, parse_revision_list};
use svnmerge_core::session::{MergeSession, RevisionSource};

const DEFAULT_CONFIG_PATH: &str = "~/.config/svnmerge/config.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "svnmerge",
    version,
    about = "Merge SVN revisions one at a time, resolving conflicts by policy"
)]
struct Cli {
    /// Path to the TOML configuration file [default: ~/.config/svnmerge/config.toml].
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    merge: MergeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a commented default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct MergeArgs {
    /// Working copy to merge into.
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Source URL to merge from.
    #[arg(short, long)]
    source: Option<String>,

    /// Revisions to merge, e.g. "1200,1203-1210". Defaults to all eligible.
    #[arg(short, long)]
    revisions: Option<String>,

    /// Workspace-relative paths to keep local (comma-separated).
    #[arg(short, long = "ignore", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Directory for the run log, commit message and summary.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// List what would be merged and write a commit message preview.
    #[arg(long)]
    dry_run: bool,

    /// Commit the working copy when every revision merged.
    #[arg(long)]
    auto_commit: bool,

    /// Do not ask for confirmation when the working copy has local changes.
    #[arg(short, long)]
    yes: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let explicit_config = cli.config.is_some();
    let config_path = expand_tilde(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

    match cli.command {
        Some(Commands::Init { output }) => {
            let output = output.map(|o| expand_tilde(&o)).unwrap_or(config_path);
            init::run_init(&output)?;
            Ok(ExitCode::SUCCESS)
        }
        None => cmd_merge(cli.merge, config_path, explicit_config).await,
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

async fn cmd_merge(args: MergeArgs, config_path: PathBuf, explicit: bool) -> Result<ExitCode> {
    let revisions = match &args.revisions {
        Some(spec) => RevisionSource::Explicit(
            parse_revision_list(spec).context("invalid --revisions value")?,
        ),
        None => RevisionSource::Eligible,
    };

    let overrides = ConfigOverrides {
        workspace: args.workspace,
        source: args.source,
        ignore_paths: (!args.ignore.is_empty()).then_some(args.ignore),
        output_dir: args.output_dir,
        auto_commit: args.auto_commit,
    };
    let config = MergeConfig::load_and_resolve(&config_path, explicit, overrides)
        .with_context(|| format!("failed to load configuration ({})", config_path.display()))?;
    info!(path = %config_path.display(), explicit, "configuration loaded");

    let client = config.svn_client();
    let session = MergeSession::new(client, config);
    let merge = &session.config().merge;

    println!();
    println!("{}", style::header("svnmerge"));
    println!("  Workspace: {}", merge.workspace.display());
    println!("  Source:    {}", merge.source);
    if !merge.ignore_paths.is_empty() {
        println!("  Ignoring:  {}", merge.ignore_paths.join(", "));
    }
    if args.dry_run {
        println!("  {}", style::warn("Dry run: nothing will be merged"));
    }
    println!();

    let yes = args.yes;
    let plan = session
        .prepare(revisions, args.dry_run, |dirty| confirm_dirty(dirty, yes))
        .await
        .context("pre-merge checks failed")?;
    let Some(plan) = plan else {
        println!("{}", style::warn("Merge aborted; nothing was changed."));
        return Ok(ExitCode::SUCCESS);
    };

    if plan.revisions.is_empty() {
        println!("{}", style::success("Nothing to merge: no eligible revisions."));
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "Revisions to merge ({}): {}",
        plan.revisions.len(),
        compress_ranges(&plan.revisions)
    );

    if args.dry_run {
        report::print_plan(&plan);
        let path = session
            .preview(&plan)
            .context("failed to write commit message preview")?;
        println!(
            "{}",
            style::success(&format!("Commit message preview written to {}", path.display()))
        );
        return Ok(ExitCode::SUCCESS);
    }

    let mut reporter = progress::BarReporter::new(plan.revisions.len());
    let outcome = session.run(&plan, &mut reporter).await;
    reporter.finish();
    let outcome = outcome.context("merge run aborted")?;

    report::print_outcome(&outcome);

    if outcome.is_failure() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Confirmation gate for a working copy with uncommitted changes.
fn confirm_dirty(dirty: &[String], yes: bool) -> bool {
    println!(
        "{}",
        style::warn(&format!("Working copy has {} uncommitted change(s):", dirty.len()))
    );
    for line in dirty.iter().take(20) {
        println!("    {}", style::dim(line));
    }
    if dirty.len() > 20 {
        println!("    {}", style::dim(&format!("... and {} more", dirty.len() - 20)));
    }
    println!();
    if yes {
        return true;
    }
    match Confirm::new()
        .with_prompt("Merge on top of these changes?")
        .default(false)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            eprintln!(
                "{}",
                style::error(&format!("cannot ask for confirmation ({}); pass --yes", e))
            );
            false
        }
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merge_flags() {
        let cli = Cli::try_parse_from([
            "svnmerge",
            "-w",
            "/wc",
            "-s",
            "^/branches/rel",
            "-r",
            "10,12-14",
            "--ignore",
            "gen,docs/api",
            "-vv",
            "--dry-run",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.merge.workspace, Some(PathBuf::from("/wc")));
        assert_eq!(cli.merge.ignore, vec!["gen", "docs/api"]);
        assert_eq!(cli.merge.revisions.as_deref(), Some("10,12-14"));
        assert!(cli.merge.dry_run);
        assert!(!cli.merge.auto_commit);
    }

    #[test]
    fn test_parse_init() {
        let cli = Cli::try_parse_from(["svnmerge", "init", "--output", "./svnmerge.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Init { output: Some(ref o) }) if o == "./svnmerge.toml"
        ));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/etc/x.toml"), PathBuf::from("/etc/x.toml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/a/b.toml"), home.join("a/b.toml"));
        }
    }
}
