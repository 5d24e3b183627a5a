//! Golden-record selection: which member of a duplicate group survives.

use crate::domain::Record;
use std::cmp::Ordering;

/// Survivor policy: the member with the oldest non-null `created_at`;
/// records without a creation instant sort after those with one; ties are
/// broken by lowest external id so selection is deterministic.
pub fn select_golden<'a>(records: &[&'a Record]) -> Option<&'a Record> {
    records.iter().copied().min_by(|a, b| golden_order(a, b))
}

fn golden_order(a: &Record, b: &Record) -> Ordering {
    match (a.created_at(), b.created_at()) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then_with(|| a.external_id().cmp(b.external_id())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.external_id().cmp(b.external_id()),
    }
}

/// Advisory completeness score used for UI hints only: presence of key
/// fields plus the size of the properties blob. Never authoritative for
/// persistence.
pub fn completeness_score(record: &Record) -> u32 {
    let mut score = 0u32;
    let present = |value: &Option<String>| -> u32 {
        u32::from(value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    };
    match record {
        Record::Contact(c) => {
            score += 3 * present(&c.email);
            score += 2 * present(&c.phone);
            score += 2 * present(&c.first_name);
            score += 2 * present(&c.last_name);
            score += present(&c.company);
            score += present(&c.job_title);
        }
        Record::Company(c) => {
            score += 3 * present(&c.domain);
            score += 3 * present(&c.name);
            score += 2 * present(&c.phone);
            score += present(&c.city);
            score += present(&c.state);
            score += present(&c.industry);
        }
    }
    score + record.property_count() as u32
}

#[cfg(test)]
mod tests {
    use super::{completeness_score, select_golden};
    use crate::domain::{Contact, Record};

    fn contact(ext: &str, created_at: Option<i64>) -> Record {
        Record::Contact(Contact {
            external_id: ext.to_string(),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            company: None,
            job_title: None,
            created_at,
            updated_at: None,
            properties: None,
        })
    }

    #[test]
    fn oldest_created_at_wins() {
        let a = contact("A", Some(2_020));
        let b = contact("B", Some(2_019));
        let c = contact("C", None);
        let golden = select_golden(&[&a, &b, &c]).expect("non-empty");
        assert_eq!(golden.external_id(), "B");

        let golden = select_golden(&[&a, &c]).expect("non-empty");
        assert_eq!(golden.external_id(), "A");
    }

    #[test]
    fn all_null_created_at_falls_back_to_external_id() {
        let x = contact("X", None);
        let y = contact("Y", None);
        let golden = select_golden(&[&y, &x]).expect("non-empty");
        assert_eq!(golden.external_id(), "X");
    }

    #[test]
    fn created_at_ties_break_by_external_id() {
        let a = contact("B", Some(1_000));
        let b = contact("A", Some(1_000));
        let golden = select_golden(&[&a, &b]).expect("non-empty");
        assert_eq!(golden.external_id(), "A");
    }

    #[test]
    fn empty_slice_selects_nothing() {
        assert!(select_golden(&[]).is_none());
    }

    #[test]
    fn completeness_counts_fields_and_properties() {
        let mut c = contact("A", None);
        if let Record::Contact(inner) = &mut c {
            inner.email = Some("a@x.com".to_string());
            inner.properties = Some("{\"k\":\"v\"}".to_string());
        }
        let empty = contact("B", None);
        assert!(completeness_score(&c) > completeness_score(&empty));
    }
}
