//! Run-wide grouping of conflicts and reverts for the end-of-run report.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;

use crate::ignore::display_relative;
use crate::models::{ConflictKind, Resolution, RevisionResult};

/// One (kind, path) conflict seen anywhere in the run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregatedConflict {
    pub relative_path: String,
    pub kind: ConflictKind,
    pub is_directory: bool,
    pub ignored: bool,
    pub resolution: Resolution,
    /// Revisions that produced this conflict, in run order.
    pub revisions: Vec<u64>,
    /// Set when the most recent resolve attempt for this path failed.
    pub unresolved: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregatedRevert {
    pub relative_path: String,
    pub is_directory: bool,
    pub revisions: Vec<u64>,
}

/// Grouped, de-duplicated view of a run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SummaryView {
    pub tree: Vec<AggregatedConflict>,
    pub text: Vec<AggregatedConflict>,
    pub property: Vec<AggregatedConflict>,
    pub reverted: Vec<AggregatedRevert>,
    pub failed: Vec<FailedRevision>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedRevision {
    pub revision: u64,
    pub error: String,
}

impl SummaryView {
    pub fn build(results: &[RevisionResult], workspace_root: &Path) -> Self {
        let mut conflicts: BTreeMap<(ConflictKind, String), AggregatedConflict> = BTreeMap::new();
        let mut reverts: HashMap<String, AggregatedRevert> = HashMap::new();
        let mut failed = Vec::new();

        for result in results {
            if let Some(error) = &result.error_message {
                failed.push(FailedRevision {
                    revision: result.revision,
                    error: error.clone(),
                });
            }

            for c in &result.conflicts {
                let rel = display_relative(&c.path, workspace_root);
                let key = (c.kind, rel.to_lowercase());
                let entry = conflicts.entry(key).or_insert_with(|| AggregatedConflict {
                    relative_path: rel,
                    kind: c.kind,
                    is_directory: c.is_directory,
                    ignored: c.ignored,
                    resolution: c.resolution,
                    revisions: Vec::new(),
                    unresolved: false,
                });
                if !entry.revisions.contains(&result.revision) {
                    entry.revisions.push(result.revision);
                }
                entry.unresolved = !c.is_resolved();
            }

            for m in &result.reverted {
                let entry = reverts
                    .entry(m.path.clone())
                    .or_insert_with(|| AggregatedRevert {
                        relative_path: display_relative(&m.path, workspace_root),
                        is_directory: m.is_directory,
                        revisions: Vec::new(),
                    });
                if !entry.revisions.contains(&result.revision) {
                    entry.revisions.push(result.revision);
                }
            }
        }

        let mut view = SummaryView {
            failed,
            ..Default::default()
        };
        for ((kind, _), conflict) in conflicts {
            match kind {
                ConflictKind::Tree => view.tree.push(conflict),
                ConflictKind::Text => view.text.push(conflict),
                ConflictKind::Property => view.property.push(conflict),
            }
        }
        for bucket in [&mut view.tree, &mut view.text, &mut view.property] {
            bucket.sort_by(|a, b| {
                a.ignored
                    .cmp(&b.ignored)
                    .then_with(|| a.relative_path.cmp(&b.relative_path))
            });
        }

        view.reverted = reverts.into_values().collect();
        view.reverted
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        view
    }

    /// Buckets in reporting order.
    pub fn buckets(&self) -> [(ConflictKind, &[AggregatedConflict]); 3] {
        [
            (ConflictKind::Tree, self.tree.as_slice()),
            (ConflictKind::Text, self.text.as_slice()),
            (ConflictKind::Property, self.property.as_slice()),
        ]
    }

    pub fn conflict_count(&self) -> usize {
        self.tree.len() + self.text.len() + self.property.len()
    }

    pub fn unresolved_count(&self) -> usize {
        self.buckets()
            .iter()
            .flat_map(|(_, b)| b.iter())
            .filter(|c| c.unresolved)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.conflict_count() == 0 && self.reverted.is_empty() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictRecord, ModificationRecord};

    const ROOT: &str = "/wc";

    fn conflict(path: &str, kind: ConflictKind) -> ConflictRecord {
        ConflictRecord::new(format!("{}/{}", ROOT, path), kind, false)
    }

    #[test]
    fn test_dedup_across_revisions() {
        let results = vec![
            RevisionResult::merged(10, vec![conflict("src/a.txt", ConflictKind::Text)], vec![]),
            RevisionResult::merged(11, vec![conflict("src/a.txt", ConflictKind::Text)], vec![]),
            RevisionResult::merged(12, vec![conflict("src/a.txt", ConflictKind::Property)], vec![]),
        ];
        let view = SummaryView::build(&results, Path::new(ROOT));
        assert_eq!(view.text.len(), 1);
        assert_eq!(view.text[0].relative_path, "src/a.txt");
        assert_eq!(view.text[0].revisions, vec![10, 11]);
        // Same path with a different kind is a separate entry.
        assert_eq!(view.property.len(), 1);
        assert_eq!(view.conflict_count(), 2);
    }

    #[test]
    fn test_bucket_ordering() {
        let results = vec![RevisionResult::merged(
            1,
            vec![
                conflict("z.txt", ConflictKind::Text),
                conflict("gen/b.txt", ConflictKind::Text).into_ignored(),
                conflict("a.txt", ConflictKind::Text),
                conflict("gen/a.txt", ConflictKind::Text).into_ignored(),
                conflict("lib", ConflictKind::Tree),
            ],
            vec![],
        )];
        let view = SummaryView::build(&results, Path::new(ROOT));
        let text: Vec<_> = view.text.iter().map(|c| c.relative_path.as_str()).collect();
        assert_eq!(text, vec!["a.txt", "z.txt", "gen/a.txt", "gen/b.txt"]);
        assert_eq!(view.buckets()[0].0, ConflictKind::Tree);
        assert_eq!(view.buckets()[0].1.len(), 1);
    }

    #[test]
    fn test_reverts_dedup_and_sorted() {
        let m = |p: &str| ModificationRecord {
            path: format!("{}/{}", ROOT, p),
            is_directory: false,
        };
        let results = vec![
            RevisionResult::merged(1, vec![], vec![m("gen/z.json"), m("gen/a.json")]),
            RevisionResult::merged(2, vec![], vec![m("gen/a.json")]),
            RevisionResult::failed(3, "E155004: locked"),
        ];
        let view = SummaryView::build(&results, Path::new(ROOT));
        let paths: Vec<_> = view.reverted.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["gen/a.json", "gen/z.json"]);
        assert_eq!(view.reverted[0].revisions, vec![1, 2]);
        assert_eq!(view.failed.len(), 1);
        assert_eq!(view.failed[0].revision, 3);
    }

    #[test]
    fn test_unresolved_flag() {
        let mut c = conflict("a.txt", ConflictKind::Text);
        c.resolve_error = Some("E155027".into());
        let view = SummaryView::build(&[RevisionResult::merged(1, vec![c], vec![])], Path::new(ROOT));
        assert!(view.text[0].unresolved);
        assert_eq!(view.unresolved_count(), 1);
    }
}
