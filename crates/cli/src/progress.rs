//! Progress bar fed by the orchestrator's per-revision notifications.

use indicatif::{ProgressBar, ProgressStyle};

use svnmerge_core::merge::{Progress, ProgressReporter};
use svnmerge_core::models::OutcomeClass;

use crate::style;

pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarReporter {
    fn on_revision_start(&mut self, _index: usize, _total: usize, revision: u64) {
        self.bar.set_message(format!("merging r{}", revision));
    }

    fn on_revision_done(&mut self, progress: &Progress) {
        self.bar.set_position(progress.index as u64);
        let line = format!(
            "  [{}/{}] r{} {}",
            progress.index,
            progress.total,
            progress.revision,
            style::outcome(progress.outcome)
        );
        if progress.outcome == OutcomeClass::Failed {
            self.bar.println(style::error(line.trim_start()));
        } else {
            self.bar.println(line);
        }
    }
}
