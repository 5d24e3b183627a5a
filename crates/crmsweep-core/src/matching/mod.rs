pub mod blocking;
pub mod golden;
pub mod keys;
pub mod score;
pub mod union;

pub use blocking::{blocking_tags, build_buckets, UNKEYED_TAG};
pub use golden::{completeness_score, select_golden};
pub use keys::{contact_name_key, domain_key, email_key, phone_key};
pub use score::{score_pair, PairScore, MATCHED_FIELD_FLOOR};
pub use union::{consolidate, ConsolidatedGroup, PairEdge};
