use crate::error::Result;
use crate::paths;
use rusqlite::Connection;
use std::path::Path;

pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    paths::restrict_file_permissions(path)?;
    tune(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    tune(&conn)?;
    Ok(conn)
}

/// Per-connection tuning for this workload: imports are write-heavy bursts
/// while an analysis holds long read passes over the same tables, so the
/// journal runs in WAL mode. The store is a local cache of re-importable
/// CRM data, which makes NORMAL synchronous acceptable under WAL.
/// `potential_matches` rows must follow their group on delete, and SQLite
/// only enforces that with foreign_keys switched on per connection.
fn tune(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // A WAL checkpoint can hold the single writer briefly; wait rather
    // than surface SQLITE_BUSY into the import loop.
    conn.pragma_update(None, "busy_timeout", 5000)?;
    Ok(())
}
