pub mod engine;
pub mod orchestrator;
pub mod summary;

pub use engine::{judge_merge_output, MergeStage, MergeVerdict, RevisionMerger};
pub use orchestrator::{Progress, ProgressReporter, RunOrchestrator, SilentReporter};
pub use summary::{AggregatedConflict, AggregatedRevert, FailedRevision, SummaryView};
