//! Domain model types shared by the merge pipeline.
//!
//! These types flow from the status classifier through the revision merge
//! engine into the run summary and the end-of-run report.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Conflict kind & resolution
// ---------------------------------------------------------------------------

/// Which side of a conflict is kept when it is resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the working-copy side.
    Local,
    /// Accept the merged-in side.
    Incoming,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// Categorisation of a conflict reported by `svn status`.
///
/// Variants are declared in reporting order (tree, text, property), which is
/// also the derived `Ord`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Structural conflict (edit/delete, add/add, missing target, ...).
    Tree,
    /// Conflicting edits to file content.
    Text,
    /// Conflicting edits to versioned properties.
    Property,
}

impl ConflictKind {
    /// Resolution applied when no ignore rule overrides it.
    ///
    /// Tree conflicts keep the working copy: the incoming side of a tree
    /// conflict frequently refers to a node that no longer exists locally.
    pub fn default_resolution(self) -> Resolution {
        match self {
            Self::Tree => Resolution::Local,
            Self::Text => Resolution::Incoming,
            Self::Property => Resolution::Incoming,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Text => "text",
            Self::Property => "property",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Per-path records
// ---------------------------------------------------------------------------

/// A conflicted path left behind by a merge, together with the policy
/// decision taken for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Absolute path of the conflicted node.
    pub path: String,
    pub kind: ConflictKind,
    pub is_directory: bool,
    /// Resolution that was (or was meant to be) applied.
    pub resolution: Resolution,
    /// `true` when the path matched an ignore rule; implies `Local`.
    pub ignored: bool,
    /// Diagnostic text when the resolve call failed. The conflict is then
    /// still present in the working copy.
    pub resolve_error: Option<String>,
}

impl ConflictRecord {
    /// Build a record with the kind-based default resolution.
    pub fn new(path: impl Into<String>, kind: ConflictKind, is_directory: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            is_directory,
            resolution: kind.default_resolution(),
            ignored: false,
            resolve_error: None,
        }
    }

    /// Apply ignore policy: force `Local` and flag the record.
    pub fn into_ignored(mut self) -> Self {
        self.ignored = true;
        self.resolution = Resolution::Local;
        self
    }

    /// Whether the resolve call for this conflict succeeded.
    pub fn is_resolved(&self) -> bool {
        self.resolve_error.is_none()
    }
}

/// A path touched by a merge without any conflict marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModificationRecord {
    /// Absolute path of the modified node.
    pub path: String,
    pub is_directory: bool,
}

// ---------------------------------------------------------------------------
// Per-revision result
// ---------------------------------------------------------------------------

/// Outcome of merging a single revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevisionResult {
    pub revision: u64,
    pub success: bool,
    pub conflicts: Vec<ConflictRecord>,
    /// Ignored, non-conflicting modifications that were reverted.
    pub reverted: Vec<ModificationRecord>,
    pub error_message: Option<String>,
}

impl RevisionResult {
    /// A revision whose merge could not run at all.
    pub fn failed(revision: u64, message: impl Into<String>) -> Self {
        Self {
            revision,
            success: false,
            conflicts: Vec::new(),
            reverted: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    /// A revision that merged (possibly with conflicts and reverts).
    pub fn merged(
        revision: u64,
        conflicts: Vec<ConflictRecord>,
        reverted: Vec<ModificationRecord>,
    ) -> Self {
        Self {
            revision,
            success: true,
            conflicts,
            reverted,
            error_message: None,
        }
    }

    /// Progress class of this result.
    pub fn outcome(&self) -> OutcomeClass {
        if !self.success {
            OutcomeClass::Failed
        } else if self.conflicts.iter().any(|c| !c.ignored) {
            OutcomeClass::Conflicted
        } else if !self.conflicts.is_empty() || !self.reverted.is_empty() {
            OutcomeClass::IgnoredOnly
        } else {
            OutcomeClass::Clean
        }
    }

    /// Conflicts whose resolve call failed.
    pub fn unresolved(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }
}

/// Coarse classification of a revision outcome used for progress reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    /// The merge could not run.
    Failed,
    /// Merged with nothing to resolve or revert.
    Clean,
    /// Merged with at least one conflict not covered by an ignore rule.
    Conflicted,
    /// Merged; every conflict or modification handled was ignore-matched.
    IgnoredOnly,
}

impl std::fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Clean => write!(f, "clean"),
            Self::Conflicted => write!(f, "conflicted"),
            Self::IgnoredOnly => write!(f, "ignored-only"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Accumulated results of a run.
///
/// Counts are maintained by [`RunSummary::record`]; exactly one of
/// `succeeded`, `with_conflicts`, `failed` is incremented per revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub with_conflicts: usize,
    pub failed: usize,
    pub results: Vec<RevisionResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a revision result and update the counts.
    pub fn record(&mut self, result: RevisionResult) {
        self.total += 1;
        if !result.success {
            self.failed += 1;
        } else if result.conflicts.is_empty() {
            self.succeeded += 1;
        } else {
            self.with_conflicts += 1;
        }
        self.results.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Revisions that merged, in processing order.
    pub fn merged_revisions(&self) -> Vec<u64> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.revision)
            .collect()
    }

    /// Revisions that failed, in processing order.
    pub fn failed_revisions(&self) -> Vec<u64> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.revision)
            .collect()
    }
}
