//! `svnmerge init`: write a default configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Confirm;

use svnmerge_core::config::MergeConfig;

use crate::style;

pub fn run_init(path: &Path) -> Result<()> {
    // Guard against overwriting an existing file.
    if path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!("{}", style::warn("Aborted; existing file left untouched."));
            return Ok(());
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, MergeConfig::default_template())
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "{}",
        style::success(&format!("Configuration written to {}", path.display()))
    );
    println!("  Edit workspace and source, then run 'svnmerge --dry-run'.");
    Ok(())
}
