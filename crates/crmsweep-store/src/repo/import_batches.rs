use crate::error::{Result, StoreError};
use crmsweep_core::{BatchId, RecordKind};
use rusqlite::{params, Connection, Row};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value {
            "running" => Ok(BatchStatus::Running),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            _ => Err(StoreError::InvalidId(format!("batch status {value}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub id: BatchId,
    pub kind: RecordKind,
    pub status: BatchStatus,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub total_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub metadata: Option<String>,
}

pub struct ImportBatchesRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ImportBatchesRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn start(&self, now_ms: i64, kind: RecordKind) -> Result<ImportBatch> {
        let id = BatchId::new();
        self.conn.execute(
            "INSERT INTO import_batches (id, kind, status, started_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                kind.as_str(),
                BatchStatus::Running.as_str(),
                now_ms,
            ],
        )?;
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn update_counts(
        &self,
        id: BatchId,
        total: i64,
        success: i64,
        errors: i64,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE import_batches SET total_count = ?2, success_count = ?3, error_count = ?4
             WHERE id = ?1;",
            params![id.to_string(), total, success, errors],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn finish(&self, now_ms: i64, id: BatchId, status: BatchStatus) -> Result<ImportBatch> {
        let updated = self.conn.execute(
            "UPDATE import_batches SET status = ?2, finished_at = ?3 WHERE id = ?1;",
            params![id.to_string(), status.as_str(), now_ms],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: BatchId) -> Result<Option<ImportBatch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, status, started_at, finished_at, total_count, success_count, \
                 error_count, metadata
             FROM import_batches WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(batch_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list(&self, kind: RecordKind) -> Result<Vec<ImportBatch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, status, started_at, finished_at, total_count, success_count, \
                 error_count, metadata
             FROM import_batches WHERE kind = ?1 ORDER BY started_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([kind.as_str()])?;
        let mut batches = Vec::new();
        while let Some(row) = rows.next()? {
            batches.push(batch_from_row(row)?);
        }
        Ok(batches)
    }
}

fn batch_from_row(row: &Row<'_>) -> Result<ImportBatch> {
    let id_str: String = row.get(0)?;
    let id = BatchId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str))?;
    let kind_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    Ok(ImportBatch {
        id,
        kind: RecordKind::parse(&kind_str)?,
        status: BatchStatus::parse(&status_str)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        total_count: row.get(5)?,
        success_count: row.get(6)?,
        error_count: row.get(7)?,
        metadata: row.get(8)?,
    })
}
