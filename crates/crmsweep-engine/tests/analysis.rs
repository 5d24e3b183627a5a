use crmsweep_core::{Confidence, Contact, GroupStatus, Record, RecordKind};
use crmsweep_engine::{AnalysisConfig, CancelToken, DedupEngine, EngineError, ProgressSink, Stage};
use crmsweep_store::Store;

fn store() -> Store {
    let store = Store::open_in_memory().expect("open store");
    store.migrate().expect("migrate");
    store
}

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

fn seed(store: &Store, contacts: Vec<Contact>) {
    for c in contacts {
        store.records().upsert(&Record::Contact(c)).expect("seed");
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<(Stage, usize, usize)>,
}

impl ProgressSink for RecordingSink {
    fn progress(&mut self, stage: Stage, current: usize, total: usize) {
        self.events.push((stage, current, total));
    }
}

struct CancellingSink {
    token: CancelToken,
}

impl ProgressSink for CancellingSink {
    fn progress(&mut self, stage: Stage, _current: usize, _total: usize) {
        if stage == Stage::FuzzyMatch {
            self.token.cancel();
        }
    }
}

fn member_sets(store: &Store, kind: RecordKind) -> Vec<Vec<String>> {
    let mut sets: Vec<Vec<String>> = store
        .groups()
        .list(kind, Some(GroupStatus::Pending))
        .expect("list groups")
        .into_iter()
        .map(|g| {
            let mut ids: Vec<String> = g
                .matches
                .iter()
                .map(|m| m.record_external_id.clone())
                .collect();
            ids.sort();
            ids
        })
        .collect();
    sets.sort();
    sets
}

#[test]
fn exact_email_grouping_is_case_insensitive() {
    let store = store();
    let mut a = contact("A");
    a.email = Some("a@x.com".to_string());
    a.created_at = Some(2_000);
    let mut b = contact("B");
    b.email = Some("A@X.COM".to_string());
    b.created_at = Some(1_000);
    let mut c = contact("C");
    c.email = Some("c@y.com".to_string());
    seed(&store, vec![a, b, c]);

    let mut config = AnalysisConfig::new(RecordKind::Contact);
    config.run_fuzzy = false;
    let summary = DedupEngine::new(&store)
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("run analysis");

    assert_eq!(summary.exact_groups, 1);
    assert_eq!(summary.total_groups, 1);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.by_confidence.high, 1);

    let groups = store
        .groups()
        .list(RecordKind::Contact, Some(GroupStatus::Pending))
        .expect("list");
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.group.confidence, Confidence::High);
    // Oldest creation instant wins the golden slot.
    assert_eq!(group.group.golden_external_id.as_deref(), Some("B"));
    for m in &group.matches {
        assert_eq!(m.match_score, 1.0);
        assert_eq!(m.is_primary, m.record_external_id == "B");
    }
    assert_eq!(member_sets(&store, RecordKind::Contact), vec![vec!["A", "B"]]);
}

#[test]
fn phone_variants_group_exactly() {
    let store = store();
    let mut a = contact("A");
    a.phone = Some("+1 415-555-0100".to_string());
    let mut b = contact("B");
    b.phone = Some("(415) 555-0100".to_string());
    let mut c = contact("C");
    c.phone = Some("415 555 0101".to_string());
    seed(&store, vec![a, b, c]);

    let mut config = AnalysisConfig::new(RecordKind::Contact);
    config.run_fuzzy = false;
    DedupEngine::new(&store)
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("run analysis");

    assert_eq!(member_sets(&store, RecordKind::Contact), vec![vec!["A", "B"]]);
}

#[test]
fn fuzzy_grouping_within_blocking_buckets() {
    let store = store();
    let mut a = contact("A");
    a.first_name = Some("Jon".to_string());
    a.last_name = Some("Smith".to_string());
    a.company = Some("Acme".to_string());
    a.email = Some("jon@acme.com".to_string());
    a.created_at = Some(1_000);
    let mut b = contact("B");
    b.first_name = Some("John".to_string());
    b.last_name = Some("Smith".to_string());
    b.company = Some("Acme".to_string());
    b.email = Some("jsmith@acme.com".to_string());
    b.created_at = Some(2_000);
    let mut c = contact("C");
    c.first_name = Some("Jane".to_string());
    c.last_name = Some("Doe".to_string());
    c.company = Some("Globex".to_string());
    c.email = Some("jane@globex.com".to_string());
    seed(&store, vec![a, b, c]);

    let config = AnalysisConfig::new(RecordKind::Contact);
    let summary = DedupEngine::new(&store)
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("run analysis");

    assert_eq!(summary.fuzzy_groups, 1);
    assert_eq!(member_sets(&store, RecordKind::Contact), vec![vec!["A", "B"]]);

    let groups = store
        .groups()
        .list(RecordKind::Contact, Some(GroupStatus::Pending))
        .expect("list");
    let matched = &groups[0].matches[0].matched_fields;
    for field in ["last_name", "full_name", "company"] {
        assert!(
            matched.fields.iter().any(|f| f == field),
            "expected {field} in {:?}",
            matched.fields
        );
    }
    let score = groups[0].matches[0].match_score;
    assert!((0.8..=1.0).contains(&score), "score {score}");
}

#[test]
fn exact_and_fuzzy_edges_consolidate_into_one_group() {
    let store = store();
    // A and B share an email; B and C are near-identical names.
    let mut a = contact("A");
    a.email = Some("shared@acme.com".to_string());
    a.first_name = Some("Jon".to_string());
    a.last_name = Some("Smith".to_string());
    let mut b = contact("B");
    b.email = Some("SHARED@acme.com".to_string());
    b.first_name = Some("Jon".to_string());
    b.last_name = Some("Smith".to_string());
    b.company = Some("Acme".to_string());
    let mut c = contact("C");
    c.email = Some("jsmith@acme.com".to_string());
    c.first_name = Some("John".to_string());
    c.last_name = Some("Smith".to_string());
    c.company = Some("Acme".to_string());
    seed(&store, vec![a, b, c]);

    let config = AnalysisConfig::new(RecordKind::Contact);
    let summary = DedupEngine::new(&store)
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("run analysis");

    // One consolidated group; a record never sits in two live groups.
    assert_eq!(summary.total_groups, 1);
    assert_eq!(
        member_sets(&store, RecordKind::Contact),
        vec![vec!["A", "B", "C"]]
    );
}

#[test]
fn rerunning_with_clear_existing_is_deterministic() {
    let store = store();
    let mut records = Vec::new();
    for (ext, first) in [("A", "Jon"), ("B", "John"), ("C", "Jonn")] {
        let mut c = contact(ext);
        c.first_name = Some(first.to_string());
        c.last_name = Some("Smith".to_string());
        c.company = Some("Acme".to_string());
        c.email = Some(format!("{ext}@acme.com").to_lowercase());
        records.push(c);
    }
    for (ext, first) in [("D", "Peter"), ("E", "Petra")] {
        let mut c = contact(ext);
        c.first_name = Some(first.to_string());
        c.last_name = Some("Parker".to_string());
        c.company = Some("Globex".to_string());
        records.push(c);
    }
    seed(&store, records);

    let config = AnalysisConfig::new(RecordKind::Contact);
    let engine = DedupEngine::new(&store);
    engine
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("first run");
    let first = member_sets(&store, RecordKind::Contact);

    let summary = engine
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("second run");
    let second = member_sets(&store, RecordKind::Contact);

    assert_eq!(first, second);
    assert_eq!(summary.total_groups, first.len());
}

#[test]
fn progress_reports_both_stages() {
    let store = store();
    let mut a = contact("A");
    a.email = Some("a@x.com".to_string());
    a.last_name = Some("Smith".to_string());
    let mut b = contact("B");
    b.email = Some("a@x.com".to_string());
    b.last_name = Some("Smith".to_string());
    seed(&store, vec![a, b]);

    let mut sink = RecordingSink::default();
    DedupEngine::new(&store)
        .run(
            &AnalysisConfig::new(RecordKind::Contact),
            &mut sink,
            &CancelToken::new(),
        )
        .expect("run analysis");

    assert!(sink.events.contains(&(Stage::ExactMatch, 0, 1)));
    assert!(sink.events.contains(&(Stage::ExactMatch, 1, 1)));
    let fuzzy_final = sink
        .events
        .iter()
        .filter(|(stage, _, _)| *stage == Stage::FuzzyMatch)
        .last()
        .expect("fuzzy progress");
    assert_eq!(fuzzy_final.1, fuzzy_final.2);
}

#[test]
fn cancel_before_start_is_an_error() {
    let store = store();
    let token = CancelToken::new();
    token.cancel();
    let err = DedupEngine::new(&store)
        .run(
            &AnalysisConfig::new(RecordKind::Contact),
            &mut crmsweep_engine::NoProgress,
            &token,
        )
        .expect_err("already cancelled");
    assert!(matches!(err, EngineError::Cancelled));
}

#[test]
fn cancel_mid_fuzzy_returns_partial_summary() {
    let store = store();
    let mut records = Vec::new();
    // Several distinct buckets so cancellation lands between them.
    for (ext, last) in [("A", "Smith"), ("B", "Smithe"), ("C", "Jones"), ("D", "Joneson")] {
        let mut c = contact(ext);
        c.last_name = Some(last.to_string());
        records.push(c);
    }
    seed(&store, records);

    let token = CancelToken::new();
    let mut sink = CancellingSink {
        token: token.clone(),
    };
    let summary = DedupEngine::new(&store)
        .run(&AnalysisConfig::new(RecordKind::Contact), &mut sink, &token)
        .expect("partial run");
    assert!(summary.cancelled);
}

#[test]
fn clear_existing_false_keeps_prior_groups() {
    let store = store();
    let mut a = contact("A");
    a.email = Some("a@x.com".to_string());
    let mut b = contact("B");
    b.email = Some("a@x.com".to_string());
    seed(&store, vec![a, b]);

    let engine = DedupEngine::new(&store);
    let mut config = AnalysisConfig::new(RecordKind::Contact);
    config.run_fuzzy = false;
    engine
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("first run");

    config.clear_existing = false;
    engine
        .run(
            &config,
            &mut crmsweep_engine::NoProgress,
            &CancelToken::new(),
        )
        .expect("second run");

    let counts = store
        .groups()
        .status_counts(RecordKind::Contact)
        .expect("counts");
    assert_eq!(counts.pending, 2);
}
