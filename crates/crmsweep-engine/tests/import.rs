use crmsweep_client::{AccountInfo, ClientError, CrmClient, RecordPages};
use crmsweep_core::{Contact, Record, RecordKind};
use crmsweep_engine::{run_import, EngineError};
use crmsweep_store::repo::BatchStatus;
use crmsweep_store::Store;

struct PagedClient {
    pages: Vec<Result<Vec<Record>, ClientError>>,
}

impl CrmClient for PagedClient {
    fn account_info(&self) -> Result<AccountInfo, ClientError> {
        Ok(AccountInfo { portal_id: 42 })
    }

    fn fetch_all(&self, _kind: RecordKind) -> RecordPages<'_> {
        let pages: Vec<Result<Vec<Record>, ClientError>> = self
            .pages
            .iter()
            .map(|page| match page {
                Ok(records) => Ok(records.clone()),
                Err(_) => Err(ClientError::Http {
                    status: 500,
                    message: "scripted failure".to_string(),
                }),
            })
            .collect();
        Box::new(pages.into_iter())
    }

    fn merge(
        &self,
        _kind: RecordKind,
        _primary_id: &str,
        _secondary_id: &str,
    ) -> Result<(), ClientError> {
        Ok(())
    }
}

fn contact(ext: &str) -> Record {
    Record::Contact(Contact {
        external_id: ext.to_string(),
        first_name: None,
        last_name: None,
        email: Some(format!("{ext}@x.com").to_lowercase()),
        phone: None,
        company: None,
        job_title: None,
        created_at: None,
        updated_at: None,
        properties: None,
    })
}

fn store() -> Store {
    let store = Store::open_in_memory().expect("open store");
    store.migrate().expect("migrate");
    store
}

#[test]
fn import_pulls_every_page_and_records_counts() {
    let store = store();
    let client = PagedClient {
        pages: vec![
            Ok(vec![contact("A"), contact("B")]),
            Ok(vec![contact("C")]),
        ],
    };

    let summary = run_import(&store, &client, RecordKind::Contact).expect("import");
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.records().count(RecordKind::Contact).expect("count"), 3);

    let batches = store
        .import_batches()
        .list(RecordKind::Contact)
        .expect("batches");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].status, BatchStatus::Completed);
    assert_eq!(batches[0].success_count, 3);
    assert!(batches[0].finished_at.is_some());
}

#[test]
fn bad_records_are_counted_and_skipped() {
    let store = store();
    let client = PagedClient {
        pages: vec![Ok(vec![contact("A"), contact("  "), contact("B")])],
    };

    let summary = run_import(&store, &client, RecordKind::Contact).expect("import");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(store.records().count(RecordKind::Contact).expect("count"), 2);

    let batches = store
        .import_batches()
        .list(RecordKind::Contact)
        .expect("batches");
    assert_eq!(batches[0].status, BatchStatus::Completed);
    assert_eq!(batches[0].error_count, 1);
}

#[test]
fn page_failure_marks_the_batch_failed() {
    let store = store();
    let client = PagedClient {
        pages: vec![
            Ok(vec![contact("A")]),
            Err(ClientError::Http {
                status: 500,
                message: String::new(),
            }),
        ],
    };

    let err = run_import(&store, &client, RecordKind::Contact).expect_err("page fetch fails");
    assert!(matches!(err, EngineError::External { .. }));

    // The first page landed before the failure.
    assert_eq!(store.records().count(RecordKind::Contact).expect("count"), 1);
    let batches = store
        .import_batches()
        .list(RecordKind::Contact)
        .expect("batches");
    assert_eq!(batches[0].status, BatchStatus::Failed);
}

#[test]
fn reimport_is_idempotent() {
    let store = store();
    let client = PagedClient {
        pages: vec![Ok(vec![contact("A"), contact("B")])],
    };

    run_import(&store, &client, RecordKind::Contact).expect("first import");
    run_import(&store, &client, RecordKind::Contact).expect("second import");
    assert_eq!(store.records().count(RecordKind::Contact).expect("count"), 2);
}
