use crate::error::{Result, StoreError};
use crmsweep_core::{Confidence, GroupId, GroupStatus, MatchedFields, RecordKind};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub id: GroupId,
    pub kind: RecordKind,
    pub confidence: Confidence,
    pub golden_external_id: Option<String>,
    pub status: GroupStatus,
    pub created_at: i64,
    pub merged_at: Option<i64>,
    pub merge_strategy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PotentialMatch {
    pub id: i64,
    pub group_id: GroupId,
    pub record_external_id: String,
    /// Persisted unit is 0.0..=1.0; exact matches carry 1.0.
    pub match_score: f64,
    pub matched_fields: MatchedFields,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct GroupWithMatches {
    pub group: DuplicateGroup,
    pub matches: Vec<PotentialMatch>,
}

#[derive(Debug, Clone)]
pub struct MatchNew {
    pub record_external_id: String,
    pub match_score: f64,
    pub matched_fields: MatchedFields,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct GroupNew {
    pub kind: RecordKind,
    pub confidence: Confidence,
    pub golden_external_id: Option<String>,
    pub matches: Vec<MatchNew>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub reviewed: i64,
    pub merged: i64,
    pub dismissed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.reviewed + self.merged + self.dismissed
    }
}

pub struct GroupsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> GroupsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Creates the group row and its match rows in one transaction. The
    /// group arrives in `pending`; `is_primary` must mark at most one
    /// member, and when a golden id is supplied it must be that member.
    pub fn create(&self, now_ms: i64, new: GroupNew) -> Result<DuplicateGroup> {
        if new.matches.len() < 2 {
            return Err(StoreError::InvalidGroup(format!(
                "group requires at least two members, got {}",
                new.matches.len()
            )));
        }
        let primaries: Vec<&MatchNew> = new.matches.iter().filter(|m| m.is_primary).collect();
        if primaries.len() > 1 {
            return Err(StoreError::InvalidGroup(
                "group allows at most one primary member".to_string(),
            ));
        }
        if let Some(golden) = new.golden_external_id.as_deref() {
            let matches_primary = primaries
                .first()
                .is_some_and(|m| m.record_external_id == golden);
            if !matches_primary {
                return Err(StoreError::InvalidGroup(format!(
                    "golden record {golden} is not the primary member"
                )));
            }
        }
        for m in &new.matches {
            if !(0.0..=1.0).contains(&m.match_score) {
                return Err(StoreError::InvalidGroup(format!(
                    "match score {} outside 0.0..=1.0",
                    m.match_score
                )));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let group_id = GroupId::new();
        tx.execute(
            "INSERT INTO duplicate_groups (id, kind, confidence, golden_external_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                group_id.to_string(),
                new.kind.as_str(),
                new.confidence.as_str(),
                new.golden_external_id,
                GroupStatus::Pending.as_str(),
                now_ms,
            ],
        )?;
        for m in &new.matches {
            let matched_fields = serde_json::to_string(&m.matched_fields)?;
            tx.execute(
                "INSERT INTO potential_matches (group_id, record_external_id, match_score, matched_fields, is_primary)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    group_id.to_string(),
                    m.record_external_id,
                    m.match_score,
                    matched_fields,
                    m.is_primary as i64,
                ],
            )?;
        }
        tx.commit()?;

        self.get(group_id)?
            .ok_or_else(|| StoreError::NotFound(group_id.to_string()))
    }

    pub fn get(&self, id: GroupId) -> Result<Option<DuplicateGroup>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, confidence, golden_external_id, status, created_at, merged_at, merge_strategy
             FROM duplicate_groups WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(group_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Match rows in creation order, which the engine writes as the group's
    /// presentation order.
    pub fn matches(&self, id: GroupId) -> Result<Vec<PotentialMatch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, record_external_id, match_score, matched_fields, is_primary
             FROM potential_matches WHERE group_id = ?1 ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut matches = Vec::new();
        while let Some(row) = rows.next()? {
            matches.push(match_from_row(row)?);
        }
        Ok(matches)
    }

    pub fn get_with_matches(&self, id: GroupId) -> Result<Option<GroupWithMatches>> {
        let Some(group) = self.get(id)? else {
            return Ok(None);
        };
        let matches = self.matches(id)?;
        Ok(Some(GroupWithMatches { group, matches }))
    }

    pub fn list(
        &self,
        kind: RecordKind,
        status: Option<GroupStatus>,
    ) -> Result<Vec<GroupWithMatches>> {
        let mut stmt = match status {
            Some(_) => self.conn.prepare(
                "SELECT id, kind, confidence, golden_external_id, status, created_at, merged_at, merge_strategy
                 FROM duplicate_groups
                 WHERE kind = ?1 AND status = ?2
                 ORDER BY created_at DESC, id ASC;",
            )?,
            None => self.conn.prepare(
                "SELECT id, kind, confidence, golden_external_id, status, created_at, merged_at, merge_strategy
                 FROM duplicate_groups
                 WHERE kind = ?1
                 ORDER BY created_at DESC, id ASC;",
            )?,
        };
        let mut rows = match status {
            Some(status) => stmt.query(params![kind.as_str(), status.as_str()])?,
            None => stmt.query([kind.as_str()])?,
        };

        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(group_from_row(row)?);
        }
        drop(rows);
        drop(stmt);

        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            let matches = self.matches(group.id)?;
            out.push(GroupWithMatches { group, matches });
        }
        Ok(out)
    }

    pub fn status_counts(&self, kind: RecordKind) -> Result<StatusCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM duplicate_groups WHERE kind = ?1 GROUP BY status;",
        )?;
        let mut rows = stmt.query([kind.as_str()])?;
        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next()? {
            let status_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            match GroupStatus::from_str(&status_str)? {
                GroupStatus::Pending => counts.pending = count,
                GroupStatus::Reviewed => counts.reviewed = count,
                GroupStatus::Merged => counts.merged = count,
                GroupStatus::Dismissed => counts.dismissed = count,
            }
        }
        Ok(counts)
    }

    /// Review-flow transitions only. `merged` is written exclusively by the
    /// merge path via [`GroupsRepo::mark_merged`].
    pub fn update_status(
        &self,
        id: GroupId,
        next: GroupStatus,
        golden: Option<&str>,
    ) -> Result<DuplicateGroup> {
        if next == GroupStatus::Merged {
            return Err(StoreError::InvalidTransition(
                "status merged is applied by the merge executor".to_string(),
            ));
        }
        let group = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !group.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition(format!(
                "group {} cannot move from {} to {}",
                id, group.status, next
            )));
        }
        if let Some(golden) = golden {
            self.set_primary(id, golden)?;
        }
        self.conn.execute(
            "UPDATE duplicate_groups SET status = ?2, golden_external_id = COALESCE(?3, golden_external_id)
             WHERE id = ?1;",
            params![id.to_string(), next.as_str(), golden],
        )?;
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Finalizes a merge: status flip, golden id, merge instant and
    /// strategy, primary flag. Callers run this inside the merge
    /// transaction together with history insertion and record deletion.
    pub fn mark_merged(
        &self,
        now_ms: i64,
        id: GroupId,
        golden: &str,
        strategy: &str,
    ) -> Result<DuplicateGroup> {
        let group = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !group.status.can_transition_to(GroupStatus::Merged) {
            return Err(StoreError::InvalidTransition(format!(
                "group {} cannot move from {} to merged",
                id, group.status
            )));
        }
        self.set_primary(id, golden)?;
        self.conn.execute(
            "UPDATE duplicate_groups
             SET status = ?2, golden_external_id = ?3, merged_at = ?4, merge_strategy = ?5
             WHERE id = ?1;",
            params![
                id.to_string(),
                GroupStatus::Merged.as_str(),
                golden,
                now_ms,
                strategy,
            ],
        )?;
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Groups of a kind still awaiting resolution whose primary member is
    /// the given record.
    pub fn live_groups_with_primary(
        &self,
        kind: RecordKind,
        external_id: &str,
    ) -> Result<Vec<GroupId>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id FROM duplicate_groups g
             JOIN potential_matches m ON m.group_id = g.id
             WHERE g.kind = ?1
               AND g.status IN ('pending', 'reviewed')
               AND m.record_external_id = ?2
               AND m.is_primary = 1
             ORDER BY g.id;",
        )?;
        let mut rows = stmt.query(params![kind.as_str(), external_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            ids.push(GroupId::from_str(&raw).map_err(|_| StoreError::InvalidId(raw))?);
        }
        Ok(ids)
    }

    /// Drops all pending groups of a kind; match rows go with them via the
    /// cascade.
    pub fn clear_pending(&self, kind: RecordKind) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM duplicate_groups WHERE kind = ?1 AND status = ?2;",
            params![kind.as_str(), GroupStatus::Pending.as_str()],
        )?;
        Ok(deleted)
    }

    fn set_primary(&self, id: GroupId, golden: &str) -> Result<()> {
        let member: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM potential_matches WHERE group_id = ?1 AND record_external_id = ?2;",
            params![id.to_string(), golden],
            |row| row.get(0),
        )?;
        if member == 0 {
            return Err(StoreError::InvalidGroup(format!(
                "golden record {golden} is not a member of group {id}"
            )));
        }
        self.conn.execute(
            "UPDATE potential_matches SET is_primary = 0 WHERE group_id = ?1;",
            [id.to_string()],
        )?;
        self.conn.execute(
            "UPDATE potential_matches SET is_primary = 1
             WHERE group_id = ?1 AND record_external_id = ?2;",
            params![id.to_string(), golden],
        )?;
        Ok(())
    }
}

fn group_from_row(row: &Row<'_>) -> Result<DuplicateGroup> {
    let id_str: String = row.get(0)?;
    let id = GroupId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str))?;
    let kind_str: String = row.get(1)?;
    let confidence_str: String = row.get(2)?;
    let status_str: String = row.get(4)?;
    Ok(DuplicateGroup {
        id,
        kind: RecordKind::parse(&kind_str)?,
        confidence: Confidence::from_str(&confidence_str)?,
        golden_external_id: row.get(3)?,
        status: GroupStatus::from_str(&status_str)?,
        created_at: row.get(5)?,
        merged_at: row.get(6)?,
        merge_strategy: row.get(7)?,
    })
}

fn match_from_row(row: &Row<'_>) -> Result<PotentialMatch> {
    let group_id_str: String = row.get(1)?;
    let group_id =
        GroupId::from_str(&group_id_str).map_err(|_| StoreError::InvalidId(group_id_str))?;
    let matched_fields_raw: Option<String> = row.get(4)?;
    let matched_fields = match matched_fields_raw.as_deref() {
        Some(raw) => MatchedFields::parse(raw)?,
        None => MatchedFields::default(),
    };
    let is_primary: i64 = row.get(5)?;
    Ok(PotentialMatch {
        id: row.get(0)?,
        group_id,
        record_external_id: row.get(2)?,
        match_score: row.get(3)?,
        matched_fields,
        is_primary: is_primary != 0,
    })
}
