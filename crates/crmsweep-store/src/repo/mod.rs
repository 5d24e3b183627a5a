pub mod groups;
pub mod import_batches;
pub mod merge_history;
pub mod records;

pub use groups::{
    DuplicateGroup, GroupNew, GroupWithMatches, GroupsRepo, MatchNew, PotentialMatch, StatusCounts,
};
pub use import_batches::{BatchStatus, ImportBatch, ImportBatchesRepo};
pub use merge_history::{MergeHistoryEntry, MergeHistoryNew, MergeHistoryRepo};
pub use records::RecordsRepo;
