pub mod error;
pub mod http;
pub mod retry;

pub use error::{ClientError, Result};
pub use http::HttpCrmClient;
pub use retry::RetryPolicy;

use crmsweep_core::{Record, RecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub portal_id: i64,
}

/// A finite, non-restartable sequence of record pages. Callers pull every
/// page within a single run; pages are not cached across runs.
pub type RecordPages<'a> = Box<dyn Iterator<Item = Result<Vec<Record>>> + 'a>;

/// The external CRM collaborator. The implementation owns rate limiting and
/// transport concerns; callers own any per-operation retry policy.
pub trait CrmClient {
    fn account_info(&self) -> Result<AccountInfo>;
    fn fetch_all(&self, kind: RecordKind) -> RecordPages<'_>;
    fn merge(&self, kind: RecordKind, primary_id: &str, secondary_id: &str) -> Result<()>;
}
