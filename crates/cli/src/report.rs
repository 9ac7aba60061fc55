//! End-of-run console report.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use svnmerge_core::commit_message::first_line;
use svnmerge_core::merge::AggregatedConflict;
use svnmerge_core::models::ConflictKind;
use svnmerge_core::revisions::compress_ranges;
use svnmerge_core::session::{CommitOutcome, MergePlan, RunOutcome};

use crate::style;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Dry-run listing: one row per planned revision.
pub fn print_plan(plan: &MergePlan) {
    let mut table = new_table(vec!["Revision", "Log message"]);
    for &rev in &plan.revisions {
        let line = first_line(plan.message(rev));
        let line = if line.is_empty() { "(no log message)" } else { line };
        table.add_row(vec![Cell::new(format!("r{}", rev)), Cell::new(line)]);
    }
    println!();
    println!("{}", table);
    println!();
}

fn bucket_title(kind: ConflictKind) -> &'static str {
    match kind {
        ConflictKind::Tree => "Tree conflicts",
        ConflictKind::Text => "Text conflicts",
        ConflictKind::Property => "Property conflicts",
    }
}

fn conflict_table(entries: &[AggregatedConflict]) -> Table {
    let mut table = new_table(vec!["Path", "Kept", "Revisions", "Status"]);
    for c in entries {
        let path = if c.is_directory {
            format!("{}/", c.relative_path)
        } else {
            c.relative_path.clone()
        };
        let status = if c.unresolved {
            Cell::new("UNRESOLVED").fg(Color::Red)
        } else if c.ignored {
            Cell::new("ignored").fg(Color::Cyan)
        } else {
            Cell::new("resolved").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(path),
            Cell::new(c.resolution.to_string()),
            Cell::new(compress_ranges(&c.revisions)),
            status,
        ]);
    }
    table
}

pub fn print_outcome(outcome: &RunOutcome) {
    let s = &outcome.summary;
    let view = &outcome.view;

    println!();
    println!("{}", style::header("Merge summary"));
    println!("  Total:          {}", s.total);
    println!("  Clean:          {}", s.succeeded);
    println!("  With conflicts: {}", s.with_conflicts);
    if s.failed > 0 {
        println!("  {}", style::error(&format!("Failed:         {}", s.failed)));
    } else {
        println!("  Failed:         0");
    }
    println!();

    if !view.failed.is_empty() {
        println!("{}", style::header(&format!("Failed revisions ({})", view.failed.len())));
        let mut table = new_table(vec!["Revision", "Error"]);
        for f in &view.failed {
            table.add_row(vec![
                Cell::new(format!("r{}", f.revision)).fg(Color::Red),
                Cell::new(first_line(&f.error)),
            ]);
        }
        println!("{}", table);
        println!();
    }

    for (kind, entries) in view.buckets() {
        if entries.is_empty() {
            continue;
        }
        println!(
            "{}",
            style::header(&format!("{} ({})", bucket_title(kind), entries.len()))
        );
        println!("{}", conflict_table(entries));
        println!();
    }

    if !view.reverted.is_empty() {
        println!("{}", style::header(&format!("Reverted ({})", view.reverted.len())));
        let mut table = new_table(vec!["Path", "Revisions"]);
        for r in &view.reverted {
            table.add_row(vec![
                Cell::new(&r.relative_path),
                Cell::new(compress_ranges(&r.revisions)),
            ]);
        }
        println!("{}", table);
        println!();
    }

    let unresolved = view.unresolved_count();
    if unresolved > 0 {
        println!(
            "{}",
            style::warn(&format!(
                "{} conflict(s) could not be resolved; see the run log",
                unresolved
            ))
        );
    }

    match &outcome.commit {
        CommitOutcome::Disabled => {}
        CommitOutcome::Skipped { reason } => {
            println!("{}", style::warn(&format!("Auto-commit skipped: {}", reason)))
        }
        CommitOutcome::Committed { revision } => {
            println!("{}", style::success(&format!("Committed r{}", revision)))
        }
        CommitOutcome::Failed { error } => {
            println!("{}", style::error(&format!("Auto-commit failed: {}", error)))
        }
    }

    println!("  Run log:        {}", style::dim(&outcome.log_path.display().to_string()));
    if let Some(path) = &outcome.commit_message_path {
        println!("  Commit message: {}", style::dim(&path.display().to_string()));
    }
    println!("  Summary:        {}", style::dim(&outcome.summary_path.display().to_string()));
    println!();

    if s.has_failures() {
        println!("{}", style::error("Some revisions failed to merge."));
    } else {
        println!("{}", style::success("All revisions merged."));
    }
}
