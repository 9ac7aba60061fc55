//! Shared styling utilities for the CLI.

use console::Style;

use svnmerge_core::models::OutcomeClass;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Colored label for a revision outcome. Failures are bold red so they
/// stand out in long runs.
pub fn outcome(outcome: OutcomeClass) -> String {
    let style = match outcome {
        OutcomeClass::Failed => Style::new().red().bold(),
        OutcomeClass::Clean => Style::new().green(),
        OutcomeClass::Conflicted => Style::new().yellow(),
        OutcomeClass::IgnoredOnly => Style::new().cyan(),
    };
    style.apply_to(outcome.to_string()).to_string()
}
