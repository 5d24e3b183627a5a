//! Pure canonicalization helpers for identity fields. Every normalizer is
//! idempotent and treats missing/empty input as the empty string.

mod domain;
mod email;
mod phone;
mod text;

pub use domain::normalize_domain;
pub use email::normalize_email;
pub use phone::{normalize_phone, PhoneNumber};
pub use text::normalize_text;
