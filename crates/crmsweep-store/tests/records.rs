use crmsweep_core::{Company, Contact, Record, RecordKind};
use crmsweep_store::Store;

fn contact(ext: &str) -> Contact {
    Contact {
        external_id: ext.to_string(),
        first_name: None,
        last_name: None,
        email: None,
        phone: None,
        company: None,
        job_title: None,
        created_at: None,
        updated_at: None,
        properties: None,
    }
}

fn company(ext: &str) -> Company {
    Company {
        external_id: ext.to_string(),
        name: None,
        domain: None,
        phone: None,
        city: None,
        state: None,
        industry: None,
        created_at: None,
        updated_at: None,
        properties: None,
    }
}

fn store() -> Store {
    let store = Store::open_in_memory().expect("open store");
    store.migrate().expect("migrate");
    store
}

#[test]
fn upsert_then_get_round_trips() {
    let store = store();
    let mut c = contact("ext-1");
    c.first_name = Some("Ada".to_string());
    c.email = Some("ada@example.com".to_string());
    c.created_at = Some(1_000);
    c.properties = Some("{\"k\":\"v\"}".to_string());
    store
        .records()
        .upsert(&Record::Contact(c.clone()))
        .expect("upsert");

    let loaded = store
        .records()
        .get(RecordKind::Contact, "ext-1")
        .expect("get")
        .expect("present");
    assert_eq!(loaded, Record::Contact(c));
}

#[test]
fn upsert_replaces_on_reimport() {
    let store = store();
    let mut c = contact("ext-1");
    c.email = Some("old@example.com".to_string());
    store.records().upsert(&Record::Contact(c)).expect("insert");

    let mut c = contact("ext-1");
    c.email = Some("new@example.com".to_string());
    store
        .records()
        .upsert(&Record::Contact(c))
        .expect("replace");

    assert_eq!(store.records().count(RecordKind::Contact).expect("count"), 1);
    let loaded = store
        .records()
        .get(RecordKind::Contact, "ext-1")
        .expect("get")
        .expect("present");
    let Record::Contact(loaded) = loaded else {
        panic!("expected contact");
    };
    assert_eq!(loaded.email.as_deref(), Some("new@example.com"));
}

#[test]
fn blank_external_id_is_rejected() {
    let store = store();
    let err = store
        .records()
        .upsert(&Record::Contact(contact("  ")))
        .expect_err("must reject");
    assert!(err.to_string().contains("external id"));
}

#[test]
fn email_groups_are_case_insensitive() {
    let store = store();
    for (ext, email) in [("A", "a@x.com"), ("B", "A@X.COM"), ("C", "c@y.com")] {
        let mut c = contact(ext);
        c.email = Some(email.to_string());
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }

    let groups = store.records().contact_email_groups().expect("groups");
    assert_eq!(groups.len(), 1);
    let mut members = groups[0].clone();
    members.sort();
    assert_eq!(members, vec!["A", "B"]);
}

#[test]
fn phone_groups_normalize_formatting_and_prefix() {
    let store = store();
    for (ext, phone) in [
        ("A", "+1 415-555-0100"),
        ("B", "(415) 555-0100"),
        ("C", "415 555 0101"),
    ] {
        let mut c = contact(ext);
        c.phone = Some(phone.to_string());
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }

    let groups = store.records().contact_phone_groups().expect("groups");
    assert_eq!(groups.len(), 1);
    let mut members = groups[0].clone();
    members.sort();
    assert_eq!(members, vec!["A", "B"]);
}

#[test]
fn nine_digit_phones_never_group() {
    let store = store();
    for ext in ["A", "B"] {
        let mut c = contact(ext);
        c.phone = Some("415 555 010".to_string()); // 9 digits
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }
    assert!(store
        .records()
        .contact_phone_groups()
        .expect("groups")
        .is_empty());

    // The same numbers with a tenth digit group fine.
    for ext in ["A", "B"] {
        let mut c = contact(ext);
        c.phone = Some("415 555 0100".to_string());
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }
    assert_eq!(
        store.records().contact_phone_groups().expect("groups").len(),
        1
    );
}

#[test]
fn domain_groups_collapse_url_variants() {
    let store = store();
    for (ext, domain) in [
        ("A", "www.acme.com"),
        ("B", "http://acme.com/path"),
        ("C", "ACME.COM."),
        ("D", "globex.com"),
    ] {
        let mut c = company(ext);
        c.domain = Some(domain.to_string());
        store.records().upsert(&Record::Company(c)).expect("upsert");
    }

    let groups = store.records().company_domain_groups().expect("groups");
    assert_eq!(groups.len(), 1);
    let mut members = groups[0].clone();
    members.sort();
    assert_eq!(members, vec!["A", "B", "C"]);
}

#[test]
fn exact_group_members_order_by_updated_at_desc() {
    let store = store();
    for (ext, updated) in [("A", Some(1_000)), ("B", Some(3_000)), ("C", None)] {
        let mut c = contact(ext);
        c.email = Some("shared@x.com".to_string());
        c.updated_at = updated;
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }

    let groups = store.records().contact_email_groups().expect("groups");
    let expected = vec![vec!["B".to_string(), "A".to_string(), "C".to_string()]];
    assert_eq!(groups, expected);
}

#[test]
fn list_pages_and_orders_by_updated_desc() {
    let store = store();
    for (ext, updated) in [("A", Some(1_000)), ("B", Some(3_000)), ("C", None)] {
        let mut c = contact(ext);
        c.updated_at = updated;
        store.records().upsert(&Record::Contact(c)).expect("upsert");
    }

    let page = store
        .records()
        .list(RecordKind::Contact, Some(2), 0)
        .expect("list");
    let ids: Vec<&str> = page.iter().map(|r| r.external_id()).collect();
    assert_eq!(ids, vec!["B", "A"]);

    let rest = store
        .records()
        .list(RecordKind::Contact, Some(2), 2)
        .expect("list");
    let ids: Vec<&str> = rest.iter().map(|r| r.external_id()).collect();
    assert_eq!(ids, vec!["C"]);
}

#[test]
fn contacts_without_email_feed_the_name_key() {
    let store = store();
    let mut with_email = contact("A");
    with_email.email = Some("a@x.com".to_string());
    store
        .records()
        .upsert(&Record::Contact(with_email))
        .expect("upsert");
    let mut blank = contact("B");
    blank.email = Some("   ".to_string());
    store
        .records()
        .upsert(&Record::Contact(blank))
        .expect("upsert");
    store
        .records()
        .upsert(&Record::Contact(contact("C")))
        .expect("upsert");

    let candidates = store.records().contacts_without_email().expect("list");
    let ids: Vec<&str> = candidates.iter().map(|c| c.external_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "C"]);
}

#[test]
fn delete_and_get_many() {
    let store = store();
    for ext in ["A", "B", "C"] {
        store
            .records()
            .upsert(&Record::Contact(contact(ext)))
            .expect("upsert");
    }
    store
        .records()
        .delete(RecordKind::Contact, "B")
        .expect("delete");

    let loaded = store
        .records()
        .get_many(
            RecordKind::Contact,
            &["A".to_string(), "B".to_string(), "C".to_string()],
        )
        .expect("get many");
    let ids: Vec<&str> = loaded.iter().map(|r| r.external_id()).collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[test]
fn record_error_bumps_retry_bookkeeping() {
    let store = store();
    store
        .records()
        .upsert(&Record::Contact(contact("A")))
        .expect("upsert");
    store
        .records()
        .record_error(RecordKind::Contact, "A", "remote merge failed")
        .expect("record error");
    store
        .records()
        .record_error(RecordKind::Contact, "A", "remote merge failed again")
        .expect("record error");

    let (retries, last_error): (i64, Option<String>) = store
        .connection()
        .query_row(
            "SELECT retry_count, last_error FROM contacts WHERE external_id = 'A';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("row");
    assert_eq!(retries, 2);
    assert_eq!(last_error.as_deref(), Some("remote merge failed again"));
}
