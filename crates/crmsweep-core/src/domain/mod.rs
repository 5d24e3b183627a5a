mod group;
mod ids;
mod record;

pub use group::{Confidence, FieldScore, GroupStatus, MatchedFields};
pub use ids::{BatchId, GroupId};
pub use record::{Company, Contact, Record, RecordKind};
