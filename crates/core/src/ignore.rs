//! Ignore-path matching for merge policy.
//!
//! An ignore rule is a path relative to the working-copy root naming a file
//! or a directory. A candidate path matches when its workspace-relative form
//! equals the rule or lies beneath it:
//!
//! | Rule      | Path                | Match |
//! |-----------|---------------------|-------|
//! | `gen`     | `gen`               | yes   |
//! | `gen`     | `gen/data.json`     | yes   |
//! | `src/gen` | `src/generated/x`   | no    |
//! | `Gen/`    | `gen\Data.json`     | yes   |
//!
//! Comparison is case-insensitive after normalising `\` to `/`. There is no
//! globbing.

use std::path::Path;

use tracing::debug;

/// Case folding shared by matching and display.
fn fold(s: &str) -> String {
    s.to_lowercase()
}

/// Normalise a path-ish string for comparison: forward slashes, no leading
/// `./` or `/`, no trailing `/`, lowercase.
fn normalize(path: &str) -> String {
    let mut s = path.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    fold(s.trim_matches('/'))
}

/// Express `path` relative to `workspace_root`, normalised.
///
/// Paths outside the root (or already relative) are returned normalised as
/// they are.
pub fn relative_to(path: &str, workspace_root: &Path) -> String {
    let root = normalize(&workspace_root.to_string_lossy());
    let candidate = normalize(path);
    if root.is_empty() {
        return candidate;
    }
    if candidate == root {
        return String::new();
    }
    match candidate.strip_prefix(&root) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => candidate,
    }
}

/// Same as [`relative_to`] but preserving the original case, for display.
pub fn display_relative(path: &str, workspace_root: &Path) -> String {
    let root = workspace_root.to_string_lossy().replace('\\', "/");
    let root = fold(root.trim_end_matches('/'));
    let candidate = path.replace('\\', "/");
    if root.is_empty() {
        return candidate;
    }
    // Folding may change byte lengths, so compare at each component boundary.
    let boundaries = candidate
        .match_indices('/')
        .map(|(i, _)| i)
        .chain(std::iter::once(candidate.len()));
    for end in boundaries {
        if fold(&candidate[..end]) != root {
            continue;
        }
        let rest = &candidate[end..];
        if rest.is_empty() {
            return ".".to_string();
        }
        return rest.trim_start_matches('/').to_string();
    }
    candidate
}

/// A compiled set of ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    /// Original rule text, for reporting.
    rules: Vec<String>,
    /// Normalised rule text, index-aligned with `rules`.
    normalized: Vec<String>,
}

impl IgnoreMatcher {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut matcher = Self::default();
        for rule in rules {
            let rule = rule.into();
            let norm = normalize(&rule);
            if norm.is_empty() {
                continue;
            }
            matcher.rules.push(rule);
            matcher.normalized.push(norm);
        }
        matcher
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// The first rule that covers `path`, if any.
    pub fn matching_rule(&self, path: &str, workspace_root: &Path) -> Option<&str> {
        if self.normalized.is_empty() {
            return None;
        }
        let rel = relative_to(path, workspace_root);
        let hit = self.normalized.iter().position(|rule| {
            rel == *rule
                || rel
                    .strip_prefix(rule.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })?;
        debug!(path, rule = self.rules[hit].as_str(), "path matches ignore rule");
        Some(self.rules[hit].as_str())
    }

    pub fn is_ignored(&self, path: &str, workspace_root: &Path) -> bool {
        self.matching_rule(path, workspace_root).is_some()
    }
}

/// Free-function form of [`IgnoreMatcher::is_ignored`].
pub fn is_ignored(path: &str, workspace_root: &Path, rules: &[String]) -> bool {
    IgnoreMatcher::new(rules.iter().cloned()).is_ignored(path, workspace_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/work/trunk";

    fn matcher(rules: &[&str]) -> IgnoreMatcher {
        IgnoreMatcher::new(rules.iter().copied())
    }

    #[test]
    fn test_empty_rules_never_match() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert!(!m.is_ignored("/work/trunk/gen/data.json", Path::new(ROOT)));
        assert!(!is_ignored("/work/trunk/a", Path::new(ROOT), &[]));
    }

    #[test]
    fn test_exact_match() {
        let m = matcher(&["gen/data.json"]);
        assert!(m.is_ignored("/work/trunk/gen/data.json", Path::new(ROOT)));
    }

    #[test]
    fn test_nested_under_directory_rule() {
        let m = matcher(&["gen"]);
        assert!(m.is_ignored("/work/trunk/gen", Path::new(ROOT)));
        assert!(m.is_ignored("/work/trunk/gen/data.json", Path::new(ROOT)));
        assert!(m.is_ignored("/work/trunk/gen/deep/er/x.bin", Path::new(ROOT)));
    }

    #[test]
    fn test_sibling_prefix_does_not_match() {
        let m = matcher(&["src/gen"]);
        assert!(!m.is_ignored("/work/trunk/src/generated/x", Path::new(ROOT)));
        assert!(!m.is_ignored("/work/trunk/src/gen.rs", Path::new(ROOT)));
        assert!(m.is_ignored("/work/trunk/src/gen/x", Path::new(ROOT)));
    }

    #[test]
    fn test_case_and_separator_insensitive() {
        let m = matcher(&["Gen\\Output/"]);
        assert!(m.is_ignored("/work/trunk/gen/output/File.TXT", Path::new(ROOT)));
        assert!(m.is_ignored("C:\\work\\trunk\\GEN\\OUTPUT", Path::new("C:\\work\\trunk")));
    }

    #[test]
    fn test_relative_candidate_paths() {
        let m = matcher(&["./docs"]);
        assert!(m.is_ignored("docs/readme.txt", Path::new(ROOT)));
        assert!(!m.is_ignored("documents/readme.txt", Path::new(ROOT)));
    }

    #[test]
    fn test_workspace_root_itself_is_never_ignored() {
        let m = matcher(&["gen", "/"]);
        assert_eq!(m.rules(), &["gen".to_string()]);
        assert!(!m.is_ignored("/work/trunk", Path::new(ROOT)));
    }

    #[test]
    fn test_matching_rule_reports_first_hit() {
        let m = matcher(&["lib", "lib/vendor"]);
        assert_eq!(
            m.matching_rule("/work/trunk/lib/vendor/a.c", Path::new(ROOT)),
            Some("lib")
        );
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("/work/trunk/A/b.txt", Path::new(ROOT)), "a/b.txt");
        assert_eq!(relative_to("/work/trunk", Path::new(ROOT)), "");
        assert_eq!(relative_to("/work/trunkX/a", Path::new(ROOT)), "work/trunkx/a");
    }

    #[test]
    fn test_display_relative_keeps_case() {
        assert_eq!(
            display_relative("/work/trunk/Src/Main.java", Path::new(ROOT)),
            "Src/Main.java"
        );
        assert_eq!(display_relative("/work/trunk", Path::new(ROOT)), ".");
        assert_eq!(display_relative("/elsewhere/x", Path::new(ROOT)), "/elsewhere/x");
    }

    #[test]
    fn test_non_ascii_root_folds_alike() {
        let root = Path::new("/Работа/Ствол");
        let path = "/работа/ствол/Gen/Data.json";
        assert_eq!(relative_to(path, root), "gen/data.json");
        assert_eq!(display_relative(path, root), "Gen/Data.json");
        assert!(matcher(&["gen"]).is_ignored(path, root));
        assert_eq!(display_relative("/работа/стволы/x", root), "/работа/стволы/x");
    }
}
