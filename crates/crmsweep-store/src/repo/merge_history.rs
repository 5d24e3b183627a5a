use crate::error::{Result, StoreError};
use crmsweep_core::{GroupId, RecordKind};
use rusqlite::{params, Connection, Row};
use std::str::FromStr;

/// Immutable audit row written once per completed merge.
#[derive(Debug, Clone)]
pub struct MergeHistoryEntry {
    pub id: i64,
    pub group_id: GroupId,
    pub primary_external_id: String,
    pub absorbed_external_ids: Vec<String>,
    pub kind: RecordKind,
    pub merged_at: i64,
    pub merge_strategy: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MergeHistoryNew {
    pub group_id: GroupId,
    pub primary_external_id: String,
    pub absorbed_external_ids: Vec<String>,
    pub kind: RecordKind,
    pub merge_strategy: Option<String>,
    pub metadata: Option<String>,
}

pub struct MergeHistoryRepo<'a> {
    conn: &'a Connection,
}

impl<'a> MergeHistoryRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, now_ms: i64, new: MergeHistoryNew) -> Result<MergeHistoryEntry> {
        let absorbed = serde_json::to_string(&new.absorbed_external_ids)?;
        self.conn.execute(
            "INSERT INTO merge_history (group_id, primary_external_id, absorbed_external_ids, \
                 kind, merged_at, merge_strategy, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                new.group_id.to_string(),
                new.primary_external_id,
                absorbed,
                new.kind.as_str(),
                now_ms,
                new.merge_strategy,
                new.metadata,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("merge history {id}")))
    }

    pub fn get(&self, id: i64) -> Result<Option<MergeHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, primary_external_id, absorbed_external_ids, kind, merged_at, \
                 merge_strategy, metadata
             FROM merge_history WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(entry_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list(&self, kind: RecordKind) -> Result<Vec<MergeHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, primary_external_id, absorbed_external_ids, kind, merged_at, \
                 merge_strategy, metadata
             FROM merge_history WHERE kind = ?1 ORDER BY merged_at DESC, id DESC;",
        )?;
        let mut rows = stmt.query([kind.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(entry_from_row(row)?);
        }
        Ok(entries)
    }

    pub fn for_group(&self, group_id: GroupId) -> Result<Vec<MergeHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, primary_external_id, absorbed_external_ids, kind, merged_at, \
                 merge_strategy, metadata
             FROM merge_history WHERE group_id = ?1 ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([group_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(entry_from_row(row)?);
        }
        Ok(entries)
    }

    /// Whether a record was absorbed by any completed merge of this kind.
    /// The stored list is decoded and compared id-by-id; substring checks
    /// against the serialized text would false-positive on ids that contain
    /// other ids.
    pub fn is_record_merged(&self, kind: RecordKind, external_id: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT absorbed_external_ids FROM merge_history WHERE kind = ?1;")?;
        let mut rows = stmt.query([kind.as_str()])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let absorbed: Vec<String> = serde_json::from_str(&raw)?;
            if absorbed.iter().any(|id| id == external_id) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn entry_from_row(row: &Row<'_>) -> Result<MergeHistoryEntry> {
    let group_id_str: String = row.get(1)?;
    let group_id =
        GroupId::from_str(&group_id_str).map_err(|_| StoreError::InvalidId(group_id_str))?;
    let absorbed_raw: String = row.get(3)?;
    let absorbed_external_ids: Vec<String> = serde_json::from_str(&absorbed_raw)?;
    let kind_str: String = row.get(4)?;
    Ok(MergeHistoryEntry {
        id: row.get(0)?,
        group_id,
        primary_external_id: row.get(2)?,
        absorbed_external_ids,
        kind: RecordKind::parse(&kind_str)?,
        merged_at: row.get(5)?,
        merge_strategy: row.get(6)?,
        metadata: row.get(7)?,
    })
}
