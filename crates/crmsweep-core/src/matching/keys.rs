//! Exact identity keys. Two records of a kind sharing a key value are an
//! exact duplicate pair.

use crate::domain::Contact;
use crate::normalize::{normalize_domain, normalize_email, normalize_phone};

pub const KEY_EMAIL: &str = "email";
pub const KEY_PHONE: &str = "phone";
pub const KEY_NAME: &str = "name";
pub const KEY_DOMAIN: &str = "domain";

pub fn email_key(value: &str) -> Option<String> {
    let normalized = normalize_email(value);
    (!normalized.is_empty()).then_some(normalized)
}

pub fn phone_key(value: &str) -> Option<String> {
    normalize_phone(value).exact_key().map(str::to_string)
}

pub fn domain_key(value: &str) -> Option<String> {
    let normalized = normalize_domain(value);
    (!normalized.is_empty()).then_some(normalized)
}

/// Name key for contacts without an email: `first last`, lowercased and
/// trimmed. Keys of 3 characters or fewer are too ambiguous to group on.
pub fn contact_name_key(contact: &Contact) -> Option<String> {
    if contact
        .email
        .as_deref()
        .is_some_and(|email| !email.trim().is_empty())
    {
        return None;
    }
    let first = contact.first_name.as_deref().unwrap_or("").trim();
    let last = contact.last_name.as_deref().unwrap_or("").trim();
    let key = format!("{} {}", first.to_lowercase(), last.to_lowercase());
    let key = key.trim().to_string();
    (key.len() > 3).then_some(key)
}
