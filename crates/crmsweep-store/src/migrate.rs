use crate::error::{Result, StoreError};
use rusqlite::{Connection, OptionalExtension};

/// Ordered schema increments. The stored version is simply how many of
/// these have been applied, so appending a file is the whole migration
/// story.
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_init.sql", include_str!("../migrations/001_init.sql")),
    (
        "002_duplicate_groups.sql",
        include_str!("../migrations/002_duplicate_groups.sql"),
    ),
    (
        "003_merge_history.sql",
        include_str!("../migrations/003_merge_history.sql"),
    ),
    (
        "004_import_batches.sql",
        include_str!("../migrations/004_import_batches.sql"),
    ),
];

/// Applies every migration past the stored version, all inside one
/// transaction; the version row is written once after the last increment
/// so a failed run leaves the database exactly where it started.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS sweep_schema (version INTEGER NOT NULL);")?;
    let current = stored_version(&tx)?;

    let latest = MIGRATIONS.len() as i64;
    if current > latest {
        return Err(StoreError::Migration(format!(
            "database schema v{current} was written by a newer crmsweep (this build knows v{latest})"
        )));
    }
    if current == latest {
        return Ok(());
    }

    for (name, sql) in &MIGRATIONS[current as usize..] {
        tx.execute_batch(sql)
            .map_err(|err| StoreError::Migration(format!("apply {name}: {err}")))?;
    }

    let updated = tx.execute("UPDATE sweep_schema SET version = ?1;", [latest])?;
    if updated != 1 {
        return Err(StoreError::Migration(format!(
            "expected one schema row, updated {updated}"
        )));
    }
    tx.commit()?;
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT version FROM sweep_schema LIMIT 1;", [], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| {
        StoreError::Migration("schema version table is empty; run migrations".to_string())
    })
}

/// Reads the single version row, seeding it at zero for a fresh database.
fn stored_version(conn: &Connection) -> Result<i64> {
    let version: Option<i64> = conn
        .query_row("SELECT version FROM sweep_schema LIMIT 1;", [], |row| {
            row.get(0)
        })
        .optional()?;
    match version {
        Some(version) => Ok(version),
        None => {
            conn.execute("INSERT INTO sweep_schema (version) VALUES (0);", [])?;
            Ok(0)
        }
    }
}
