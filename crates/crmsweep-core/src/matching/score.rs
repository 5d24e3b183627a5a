//! Weighted per-field similarity scoring for candidate pairs.

use crate::domain::{Company, Contact, FieldScore, Record};
use crate::normalize::{normalize_domain, normalize_email, normalize_phone, normalize_text};
use strsim::normalized_levenshtein;

/// A field counts as "matched" when its raw sub-score exceeds this floor.
pub const MATCHED_FIELD_FLOOR: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairScore {
    /// Weighted composite, 0..=100.
    pub composite: u8,
    /// Per-field raw sub-scores for every field compared.
    pub scores: Vec<FieldScore>,
    /// Names of fields whose sub-score exceeded the floor.
    pub matched: Vec<String>,
}

/// Scores two records of the same kind; `None` when the kinds differ.
/// Symmetric, and bad field data never fails scoring (absent or empty
/// fields are simply left out of the weighted sum).
pub fn score_pair(a: &Record, b: &Record) -> Option<PairScore> {
    match (a, b) {
        (Record::Contact(a), Record::Contact(b)) => Some(score_contacts(a, b)),
        (Record::Company(a), Record::Company(b)) => Some(score_companies(a, b)),
        _ => None,
    }
}

fn score_contacts(a: &Contact, b: &Contact) -> PairScore {
    let mut acc = Accumulator::default();
    acc.field("email", 1.5, norm_email(&a.email), norm_email(&b.email));
    acc.field(
        "full_name",
        1.3,
        a.full_name().map(|v| normalize_text(&v)),
        b.full_name().map(|v| normalize_text(&v)),
    );
    acc.field(
        "first_name",
        1.2,
        norm_text(&a.first_name),
        norm_text(&b.first_name),
    );
    acc.field(
        "last_name",
        1.2,
        norm_text(&a.last_name),
        norm_text(&b.last_name),
    );
    acc.field("phone", 1.0, norm_phone(&a.phone), norm_phone(&b.phone));
    acc.field("company", 0.8, norm_text(&a.company), norm_text(&b.company));
    acc.field(
        "job_title",
        0.6,
        norm_text(&a.job_title),
        norm_text(&b.job_title),
    );
    acc.finish()
}

fn score_companies(a: &Company, b: &Company) -> PairScore {
    let mut acc = Accumulator::default();
    acc.field("name", 1.5, norm_text(&a.name), norm_text(&b.name));
    acc.field("domain", 1.4, norm_domain(&a.domain), norm_domain(&b.domain));
    acc.field("phone", 1.0, norm_phone(&a.phone), norm_phone(&b.phone));
    acc.field("city", 0.7, norm_text(&a.city), norm_text(&b.city));
    acc.field("state", 0.6, norm_text(&a.state), norm_text(&b.state));
    acc.field(
        "industry",
        0.5,
        norm_text(&a.industry),
        norm_text(&b.industry),
    );
    acc.finish()
}

fn norm_text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(normalize_text)
}

fn norm_email(value: &Option<String>) -> Option<String> {
    value.as_deref().map(normalize_email)
}

fn norm_domain(value: &Option<String>) -> Option<String> {
    value.as_deref().map(normalize_domain)
}

fn norm_phone(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| normalize_phone(v).full)
}

#[derive(Default)]
struct Accumulator {
    weighted: f64,
    weight_sum: f64,
    scores: Vec<FieldScore>,
    matched: Vec<String>,
}

impl Accumulator {
    /// Adds one field comparison. Skipped when either side is empty.
    fn field(&mut self, name: &str, weight: f64, a: Option<String>, b: Option<String>) {
        let (Some(a), Some(b)) = (a, b) else {
            return;
        };
        if a.is_empty() || b.is_empty() {
            return;
        }
        let raw = (normalized_levenshtein(&a, &b) * 100.0).round() as u8;
        self.scores.push(FieldScore {
            field: name.to_string(),
            score: raw,
        });
        if raw > MATCHED_FIELD_FLOOR {
            self.matched.push(name.to_string());
        }
        self.weighted += f64::from(raw) * weight;
        self.weight_sum += weight;
    }

    fn finish(self) -> PairScore {
        let composite = if self.weight_sum > 0.0 {
            (self.weighted / self.weight_sum).round() as u8
        } else {
            0
        };
        PairScore {
            composite,
            scores: self.scores,
            matched: self.matched,
        }
    }
}
