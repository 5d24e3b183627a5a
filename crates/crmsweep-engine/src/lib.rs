pub mod backup;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod exact;
pub mod fuzzy;
pub mod import;
pub mod merge;
pub mod progress;

pub use backup::{prune_old_backups, write_backup};
pub use cancel::CancelToken;
pub use engine::{AnalysisConfig, AnalysisSummary, ConfidenceBreakdown, DedupEngine};
pub use error::{EngineError, Result};
pub use import::{run_import, ImportSummary};
pub use merge::{MergeExecutor, MergePreview, MergeReport, MergeRequest, RecordSummary};
pub use progress::{NoProgress, ProgressSink, Stage};
