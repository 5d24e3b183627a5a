//! Blocking tags partition the record space into buckets; only
//! within-bucket pairs are scored, bounding pair work to
//! sum over buckets of |bucket|^2 / 2.

use crate::domain::{Company, Contact, Record};
use crate::normalize::{normalize_domain, normalize_email, normalize_phone};
use std::collections::BTreeMap;

pub const UNKEYED_TAG: &str = "unkeyed";

/// Sparse records all share the `unkeyed` bucket; cap it so a pathological
/// import cannot turn the fuzzy pass quadratic.
const UNKEYED_BUCKET_CAP: usize = 1000;

const PHONE_SUFFIX_LEN: usize = 7;

pub fn blocking_tags(record: &Record) -> Vec<String> {
    let mut tags = match record {
        Record::Contact(contact) => contact_tags(contact),
        Record::Company(company) => company_tags(company),
    };
    if tags.is_empty() {
        tags.push(UNKEYED_TAG.to_string());
    }
    tags
}

fn contact_tags(contact: &Contact) -> Vec<String> {
    let mut tags = Vec::new();

    if let Some(email) = contact.email.as_deref() {
        let normalized = normalize_email(email);
        if let Some((_, domain)) = normalized.split_once('@') {
            if !domain.is_empty() {
                tags.push(format!("email-domain:{domain}"));
            }
        }
    }

    if let Some(last) = contact.last_name.as_deref() {
        let last = last.trim().to_lowercase();
        if last.chars().count() >= 2 {
            let prefix: String = last.chars().take(3).collect();
            tags.push(format!("lastname-pfx:{prefix}"));
        }
    }

    if let Some(tag) = phone_suffix_tag(contact.phone.as_deref()) {
        tags.push(tag);
    }

    tags
}

fn company_tags(company: &Company) -> Vec<String> {
    let mut tags = Vec::new();

    if let Some(domain) = company.domain.as_deref() {
        let normalized = normalize_domain(domain);
        if !normalized.is_empty() {
            tags.push(format!("domain:{normalized}"));
        }
    }

    if let Some(name) = company.name.as_deref() {
        let stripped: String = name
            .to_lowercase()
            .chars()
            .filter(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        if stripped.chars().count() >= 3 {
            let prefix: String = stripped.chars().take(4).collect();
            tags.push(format!("name-pfx:{prefix}"));
        }
    }

    if let Some(tag) = phone_suffix_tag(company.phone.as_deref()) {
        tags.push(tag);
    }

    tags
}

fn phone_suffix_tag(phone: Option<&str>) -> Option<String> {
    let digits = normalize_phone(phone?).full;
    if digits.len() < PHONE_SUFFIX_LEN {
        return None;
    }
    let suffix = &digits[digits.len() - PHONE_SUFFIX_LEN..];
    Some(format!("phone-suffix:{suffix}"))
}

/// Groups records by blocking tag. The map is ordered so bucket iteration
/// (and therefore the whole fuzzy pass) is deterministic for a given input.
pub fn build_buckets(records: &[Record]) -> BTreeMap<String, Vec<&Record>> {
    let mut buckets: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        for tag in blocking_tags(record) {
            buckets.entry(tag).or_default().push(record);
        }
    }
    if let Some(unkeyed) = buckets.get_mut(UNKEYED_TAG) {
        unkeyed.truncate(UNKEYED_BUCKET_CAP);
    }
    buckets
}
