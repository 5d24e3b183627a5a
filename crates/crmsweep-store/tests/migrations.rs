use crmsweep_store::Store;

#[test]
fn migrations_apply_once() {
    let store = Store::open_in_memory().expect("open in memory");
    store.migrate().expect("migrate");
    store.migrate().expect("migrate again");

    let version = store.schema_version().expect("schema version");
    assert_eq!(version, 4);
}

#[test]
fn newer_schema_than_code_fails() {
    let store = Store::open_in_memory().expect("open in memory");
    store.migrate().expect("migrate");
    store
        .connection()
        .execute("UPDATE sweep_schema SET version = 99;", [])
        .expect("bump version");

    let err = store.migrate().expect_err("must refuse to run");
    assert!(err.to_string().contains("newer"));
}
