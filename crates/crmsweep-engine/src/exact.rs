//! Exact matching: identity-key grouping over the store's normalized
//! columns, plus the in-memory name key for contacts without an email.

use crate::error::Result;
use crmsweep_core::matching::{keys, PairEdge};
use crmsweep_core::RecordKind;
use crmsweep_store::Store;
use std::collections::BTreeMap;

/// Emits one score-100 edge per (first member, other member) of every
/// identity-key group, labeled with the key that produced it. The star
/// topology keeps edge count linear; union-find closes the group anyway.
pub fn exact_edges(store: &Store, kind: RecordKind) -> Result<Vec<PairEdge>> {
    let mut edges = Vec::new();
    match kind {
        RecordKind::Contact => {
            for group in store.records().contact_email_groups()? {
                push_group_edges(&mut edges, &group, keys::KEY_EMAIL);
            }
            for group in store.records().contact_phone_groups()? {
                push_group_edges(&mut edges, &group, keys::KEY_PHONE);
            }
            for group in name_key_groups(store)? {
                push_group_edges(&mut edges, &group, keys::KEY_NAME);
            }
        }
        RecordKind::Company => {
            for group in store.records().company_domain_groups()? {
                push_group_edges(&mut edges, &group, keys::KEY_DOMAIN);
            }
        }
    }
    Ok(edges)
}

fn push_group_edges(edges: &mut Vec<PairEdge>, members: &[String], key: &str) {
    let Some((first, rest)) = members.split_first() else {
        return;
    };
    for other in rest {
        edges.push(PairEdge::exact(first.clone(), other.clone(), key));
    }
}

/// Name-key grouping runs in memory: it needs no index and only considers
/// contacts with no usable email.
fn name_key_groups(store: &Store) -> Result<Vec<Vec<String>>> {
    let mut by_key: BTreeMap<String, Vec<(Option<i64>, String)>> = BTreeMap::new();
    for contact in store.records().contacts_without_email()? {
        if let Some(key) = keys::contact_name_key(&contact) {
            by_key
                .entry(key)
                .or_default()
                .push((contact.updated_at, contact.external_id));
        }
    }

    let mut groups = Vec::new();
    for (_key, mut members) in by_key {
        if members.len() < 2 {
            continue;
        }
        // updated_at descending, nulls last, external id as tiebreak.
        members.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.1.cmp(&b.1)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.1.cmp(&b.1),
        });
        groups.push(members.into_iter().map(|(_, ext)| ext).collect());
    }
    Ok(groups)
}
