//! Commit message generation for a merge run.
//!
//! ```text
//! Merged revision(s) 101-103, 110 from branches/release-2.0:
//! Fix null check in parser
//! ........
//! (no log message for r102)
//! ........
//! ```

use std::collections::BTreeMap;

use crate::revisions::compress_ranges;

/// Separator line written after each revision's log body.
pub const SEPARATOR: &str = "........";

/// Human-readable branch name for a source URL.
///
/// Returns the path from the `trunk`, `branches/<name>` or `tags/<name>`
/// segment onward, or the last path segment when none of those are present.
pub fn branch_name(source: &str) -> String {
    let trimmed = source.trim_end_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    for (i, seg) in segments.iter().enumerate() {
        match *seg {
            "trunk" => return segments[i..].join("/"),
            "branches" | "tags" if i + 1 < segments.len() => {
                return segments[i..=i + 1].join("/");
            }
            _ => {}
        }
    }
    segments
        .iter()
        .rev()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Builds the commit message for a set of merged revisions.
pub struct CommitMessageBuilder<'a> {
    branch: String,
    messages: &'a BTreeMap<u64, String>,
}

impl<'a> CommitMessageBuilder<'a> {
    pub fn new(source: &str, messages: &'a BTreeMap<u64, String>) -> Self {
        Self {
            branch: branch_name(source),
            messages,
        }
    }

    pub fn header(&self, revisions: &[u64]) -> String {
        format!(
            "Merged revision(s) {} from {}:",
            compress_ranges(revisions),
            self.branch
        )
    }

    /// Header followed by each revision's log body and a separator, in the
    /// given order.
    pub fn build(&self, revisions: &[u64]) -> String {
        let mut out = self.header(revisions);
        out.push('\n');
        for rev in revisions {
            let body = self
                .messages
                .get(rev)
                .map(|m| m.trim())
                .unwrap_or_default();
            if body.is_empty() {
                out.push_str(&format!("(no log message for r{})", rev));
            } else {
                out.push_str(body);
            }
            out.push('\n');
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out
    }
}

/// First non-empty line of a log message, for one-line listings.
pub fn first_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name() {
        assert_eq!(
            branch_name("https://svn.example.com/repos/app/branches/release-2.0"),
            "branches/release-2.0"
        );
        assert_eq!(
            branch_name("https://svn.example.com/repos/app/branches/release-2.0/sub/"),
            "branches/release-2.0"
        );
        assert_eq!(branch_name("file:///srv/repo/trunk"), "trunk");
        assert_eq!(branch_name("^/tags/v1.2"), "tags/v1.2");
        assert_eq!(branch_name("https://svn.example.com/repos/feature-x"), "feature-x");
    }

    #[test]
    fn test_build_message() {
        let mut messages = BTreeMap::new();
        messages.insert(101, "Fix null check in parser\n".to_string());
        messages.insert(102, "   ".to_string());
        messages.insert(103, "Add retries\n\nDetails here".to_string());

        let builder = CommitMessageBuilder::new("^/branches/rel", &messages);
        let msg = builder.build(&[101, 102, 103, 110]);
        let expected = "Merged revision(s) 101-103, 110 from branches/rel:\n\
                        Fix null check in parser\n........\n\
                        (no log message for r102)\n........\n\
                        Add retries\n\nDetails here\n........\n\
                        (no log message for r110)\n........\n";
        assert_eq!(msg, expected);
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  Fix bug  \nmore"), "Fix bug");
        assert_eq!(first_line(""), "");
    }
}
