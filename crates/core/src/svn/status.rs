//! Classification of `svn status` output into conflicts and modifications.
//!
//! A status line is seven single-character columns, a space, then the path:
//!
//! ```text
//! column 1  item status     (' ' A C D I M R X ? ! ~)
//! column 2  property status (' ' C M)
//! column 3  working copy locked (L)
//! column 4  scheduled with history (+)
//! column 5  switched / external file (S, X)
//! column 6  lock token (K O T B)
//! column 7  tree conflict (C)
//! ```
//!
//! Precedence per line: tree conflict, then text conflict, then property
//! conflict, then any other change. Unversioned, ignored, external and clean
//! lines are skipped. Continuation lines (`      >   local edit, ...`) and
//! banner lines are not status lines and are skipped as well.

use std::path::Path;

use tracing::{debug, trace};

use crate::models::{ConflictKind, ConflictRecord, ModificationRecord};

/// Width of the status column block including the separating space.
const STATUS_PREFIX_LEN: usize = 8;

/// What a single status line says about its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Conflict(ConflictKind),
    Modified,
}

/// A parsed, non-skipped status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub class: LineClass,
}

/// Output of [`classify_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedStatus {
    pub conflicts: Vec<ConflictRecord>,
    pub modifications: Vec<ModificationRecord>,
}

fn is_item_status(c: char) -> bool {
    matches!(c, ' ' | 'A' | 'C' | 'D' | 'I' | 'M' | 'R' | 'X' | '?' | '!' | '~')
}

/// Parse one line of `svn status` output.
///
/// Returns `None` for lines that carry nothing to act on.
pub fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let columns: Vec<char> = line.chars().take(STATUS_PREFIX_LEN).collect();
    if columns.len() < STATUS_PREFIX_LEN || columns[7] != ' ' {
        return None;
    }
    let item = columns[0];
    let props = columns[1];
    let tree = columns[6];
    if !is_item_status(item) || !matches!(props, ' ' | 'C' | 'M') {
        return None;
    }
    if !matches!(tree, ' ' | 'C') {
        return None;
    }

    let path: String = line.chars().skip(STATUS_PREFIX_LEN).collect();
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let class = if tree == 'C' {
        LineClass::Conflict(ConflictKind::Tree)
    } else if item == 'C' {
        LineClass::Conflict(ConflictKind::Text)
    } else if props == 'C' {
        LineClass::Conflict(ConflictKind::Property)
    } else if matches!(item, '?' | 'I' | 'X') {
        return None;
    } else if item == ' ' && props == ' ' {
        // Lock, history and switch columns alone do not change content.
        return None;
    } else {
        LineClass::Modified
    };

    Some(StatusEntry {
        path: path.to_string(),
        class,
    })
}

/// Decide whether `path` denotes a directory.
///
/// Existing paths are inspected on disk. A path that no longer exists (tree
/// conflicts often name deleted nodes) is guessed from its name: no
/// extension means directory. This is an approximation.
pub fn is_directory_path(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_dir(),
        Err(_) => path.extension().is_none(),
    }
}

/// Classify a full status report.
///
/// Paths not already under `workspace_root` are joined onto it, so every
/// record carries a path rooted the way the workspace was given. Each path is reported at most
/// once, keeping the first classification seen.
pub fn classify_status(report: &str, workspace_root: &Path) -> ClassifiedStatus {
    let mut classified = ClassifiedStatus::default();
    let mut seen = std::collections::HashSet::new();

    for line in report.lines() {
        let Some(entry) = parse_status_line(line) else {
            trace!(line, "skipping status line");
            continue;
        };
        // svn echoes the target as given, so a relative root already
        // prefixes every path it prints.
        let entry_path = Path::new(&entry.path);
        let abs = if entry_path.is_absolute()
            || (workspace_root.is_relative() && entry_path.starts_with(workspace_root))
        {
            entry_path.to_path_buf()
        } else {
            workspace_root.join(entry_path)
        };
        let abs_str = abs.to_string_lossy().to_string();
        if !seen.insert(abs_str.clone()) {
            continue;
        }
        let is_directory = is_directory_path(&abs);

        match entry.class {
            LineClass::Conflict(kind) => {
                debug!(path = %abs_str, %kind, is_directory, "conflict detected");
                classified
                    .conflicts
                    .push(ConflictRecord::new(abs_str, kind, is_directory));
            }
            LineClass::Modified => {
                classified.modifications.push(ModificationRecord {
                    path: abs_str,
                    is_directory,
                });
            }
        }
    }

    debug!(
        conflicts = classified.conflicts.len(),
        modifications = classified.modifications.len(),
        "classified status report"
    );
    classified
}

/// Non-clean, non-external status lines, for the pre-run confirmation gate.
pub fn dirty_lines(report: &str) -> Vec<String> {
    report
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with("Performing status on external item"))
        .filter(|l| !l.starts_with('X'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;

    fn class_of(line: &str) -> Option<LineClass> {
        parse_status_line(line).map(|e| e.class)
    }

    #[test]
    fn test_text_conflict() {
        let entry = parse_status_line("C       src/a.txt").unwrap();
        assert_eq!(entry.path, "src/a.txt");
        assert_eq!(entry.class, LineClass::Conflict(ConflictKind::Text));
    }

    #[test]
    fn test_property_conflict() {
        assert_eq!(
            class_of(" C      src"),
            Some(LineClass::Conflict(ConflictKind::Property))
        );
    }

    #[test]
    fn test_tree_conflict() {
        assert_eq!(
            class_of("      C lib/removed"),
            Some(LineClass::Conflict(ConflictKind::Tree))
        );
        assert_eq!(
            class_of("A  +  C lib/moved.c"),
            Some(LineClass::Conflict(ConflictKind::Tree))
        );
    }

    #[test]
    fn test_tree_marker_takes_precedence() {
        // Text and property columns also flag conflict; tree wins.
        assert_eq!(
            class_of("CC    C src/both.txt"),
            Some(LineClass::Conflict(ConflictKind::Tree))
        );
        assert_eq!(
            class_of("C     C src/a.txt"),
            Some(LineClass::Conflict(ConflictKind::Tree))
        );
    }

    #[test]
    fn test_text_beats_property() {
        assert_eq!(
            class_of("CC      src/a.txt"),
            Some(LineClass::Conflict(ConflictKind::Text))
        );
    }

    #[test]
    fn test_modifications() {
        for line in [
            "M       src/b.txt",
            "A       src/new.txt",
            "D       src/old.txt",
            "R       src/replaced.txt",
            " M      .",
            "A  +    src/copied.txt",
            "!       src/missing.txt",
            "~       src/obstructed",
        ] {
            assert_eq!(class_of(line), Some(LineClass::Modified), "line: {line}");
        }
    }

    #[test]
    fn test_skipped_lines() {
        for line in [
            "?       scratch.txt",
            "I       build",
            "X       vendor/ext",
            "        clean.txt",
            "  L     locked.txt",
            "    S   switched",
            "      >   local edit, incoming delete upon merge",
            "Performing status on external item at 'vendor/ext':",
            "Summary of conflicts:",
            "",
            "M",
        ] {
            assert_eq!(class_of(line), None, "line: {line:?}");
        }
    }

    #[test]
    fn test_path_with_spaces_and_crlf() {
        let entry = parse_status_line("M       docs/release notes.txt\r").unwrap();
        assert_eq!(entry.path, "docs/release notes.txt");
    }

    #[test]
    fn test_classify_status_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("gen")).unwrap();

        let report = format!(
            "C       {root}/src/a.txt\n\
             M       {root}/gen\n\
             ?       {root}/scratch.txt\n      C {root}/lib/gone\n\
             \x20     >   local missing or deleted or moved away, incoming edit upon merge\n\
             \x20M      {root}\n",
            root = dir.path().display()
        );
        let classified = classify_status(&report, dir.path());

        assert_eq!(classified.conflicts.len(), 2);
        let text = &classified.conflicts[0];
        assert_eq!(text.kind, ConflictKind::Text);
        assert_eq!(text.resolution, Resolution::Incoming);
        assert!(!text.is_directory);

        let tree = &classified.conflicts[1];
        assert_eq!(tree.kind, ConflictKind::Tree);
        assert_eq!(tree.resolution, Resolution::Local);
        // Missing path without extension: guessed directory.
        assert!(tree.is_directory);

        assert_eq!(classified.modifications.len(), 2);
        assert!(classified.modifications[0].is_directory);
        assert!(classified.modifications[0].path.ends_with("gen"));
    }

    #[test]
    fn test_classify_resolves_relative_paths() {
        let root = Path::new("/nonexistent/wc");
        let classified = classify_status("M       data/file.json\n", root);
        assert_eq!(
            classified.modifications[0].path,
            "/nonexistent/wc/data/file.json"
        );
        assert!(!classified.modifications[0].is_directory);
    }

    #[test]
    fn test_classify_relative_workspace_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("wc/gen")).unwrap();
        std::fs::write(dir.path().join("wc/gen/data.json"), "{}").unwrap();

        // Relative root as svn prints it for `svn status wc`.
        let root = Path::new("wc");
        let classified = classify_status("M       wc/gen/data.json\nC       wc/a.txt\n", root);
        let modification = &classified.modifications[0];
        assert_eq!(modification.path, "wc/gen/data.json");
        assert_eq!(classified.conflicts[0].path, "wc/a.txt");
        assert!(crate::ignore::IgnoreMatcher::new(["gen"]).is_ignored(&modification.path, root));

        // The same report for an absolute root names a file that exists.
        let root = dir.path().join("wc");
        let report = format!("M       {}\n", root.join("gen/data.json").display());
        let classified = classify_status(&report, &root);
        let modification = &classified.modifications[0];
        assert!(Path::new(&modification.path).exists());
        assert!(!modification.is_directory);
        assert!(crate::ignore::IgnoreMatcher::new(["gen"]).is_ignored(&modification.path, &root));
    }

    #[test]
    fn test_classify_reports_each_path_once() {
        let root = Path::new("/nonexistent/wc");
        let classified = classify_status("C       a.txt\nM       a.txt\n", root);
        assert_eq!(classified.conflicts.len(), 1);
        assert!(classified.modifications.is_empty());
    }

    #[test]
    fn test_is_directory_heuristic() {
        assert!(is_directory_path(Path::new("/nonexistent/some/dir")));
        assert!(!is_directory_path(Path::new("/nonexistent/some/file.rs")));
        let dir = tempfile::tempdir().unwrap();
        let dotted = dir.path().join("v1.2");
        std::fs::create_dir(&dotted).unwrap();
        assert!(is_directory_path(&dotted));
    }

    #[test]
    fn test_dirty_lines() {
        let report = "M       a.txt\n\
                      X       vendor/ext\n\
                      \n\
                      Performing status on external item at 'vendor/ext':\n\
                      ?       notes.txt\n";
        assert_eq!(dirty_lines(report), vec!["M       a.txt", "?       notes.txt"]);
    }
}
