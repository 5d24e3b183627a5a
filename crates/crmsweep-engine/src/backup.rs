//! Merge backup documents: a JSON snapshot of a group's members taken just
//! before the remote merge runs.

use crate::error::Result;
use crmsweep_core::{time, Record};
use crmsweep_store::repo::GroupWithMatches;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const BACKUP_PREFIX: &str = "merge_backup_";
const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupDocument<'a> {
    timestamp: String,
    group_id: String,
    object_type: &'static str,
    primary_record_id: &'a str,
    records: &'a [Record],
    metadata: BackupMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupMetadata {
    confidence: String,
    match_score: f64,
    matched_fields: Vec<String>,
}

/// Writes `merge_backup_<kind>_<group>_<ts>.json` into `dir` and returns
/// the path. The timestamp is ISO-8601 with `:` and `.` made
/// filesystem-safe.
pub fn write_backup(
    dir: &Path,
    now_ms: i64,
    group: &GroupWithMatches,
    primary_external_id: &str,
    records: &[Record],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let match_score = group
        .matches
        .iter()
        .map(|m| m.match_score)
        .fold(0.0_f64, f64::max);
    let matched_fields: BTreeSet<String> = group
        .matches
        .iter()
        .flat_map(|m| m.matched_fields.fields.iter().cloned())
        .collect();

    let document = BackupDocument {
        timestamp: time::to_iso(now_ms),
        group_id: group.group.id.to_string(),
        object_type: group.group.kind.as_str(),
        primary_record_id: primary_external_id,
        records,
        metadata: BackupMetadata {
            confidence: group.group.confidence.as_str().to_string(),
            match_score,
            matched_fields: matched_fields.into_iter().collect(),
        },
    };

    let file_name = format!(
        "{BACKUP_PREFIX}{}_{}_{}.json",
        group.group.kind.as_str(),
        group.group.id,
        time::file_stamp(now_ms)
    );
    let path = dir.join(file_name);
    let file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, &document)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    debug!(path = %path.display(), "wrote merge backup");
    Ok(path)
}

/// Removes backup documents older than the retention window. A retention
/// of zero days disables pruning entirely.
pub fn prune_old_backups(dir: &Path, retention_days: u32, now_ms: i64) -> Result<usize> {
    if retention_days == 0 || !dir.exists() {
        return Ok(0);
    }
    let cutoff = now_ms - i64::from(retention_days) * MS_PER_DAY;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(BACKUP_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        let modified_ms = entry
            .metadata()?
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(i64::MAX);
        if modified_ms < cutoff {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "pruned old merge backups");
    }
    Ok(removed)
}
