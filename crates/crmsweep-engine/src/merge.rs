use crate::backup;
use crate::error::{EngineError, Result};
use crmsweep_client::{ClientError, CrmClient, RetryPolicy};
use crmsweep_core::{time, GroupId, Record};
use crmsweep_store::repo::{
    GroupWithMatches, GroupsRepo, MergeHistoryNew, MergeHistoryRepo, RecordsRepo,
};
use crmsweep_store::Store;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Strategy label recorded on the group and its history row.
pub const MERGE_STRATEGY: &str = "absorb-into-primary";

const LARGE_MERGE_WARNING: usize = 5;
const MANY_PROPERTIES_WARNING: usize = 20;

#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub group_id: GroupId,
    pub primary_external_id: String,
    pub create_backup: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub external_id: String,
    pub display_name: String,
    pub created_at: Option<i64>,
    pub property_count: usize,
}

impl RecordSummary {
    fn from_record(record: &Record) -> Self {
        Self {
            external_id: record.external_id().to_string(),
            display_name: record.display_name(),
            created_at: record.created_at(),
            property_count: record.property_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergePreview {
    pub primary: RecordSummary,
    pub records_to_merge: Vec<RecordSummary>,
    pub estimated_changes: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub group_id: GroupId,
    pub primary: String,
    pub absorbed: Vec<String>,
    pub backup_path: Option<PathBuf>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<MergePreview>,
}

/// Applies a user-confirmed resolution: validates the request, snapshots a
/// backup, drives the remote merge sequentially per secondary, and commits
/// all local effects in one transaction.
pub struct MergeExecutor<'a> {
    store: &'a Store,
    client: &'a dyn CrmClient,
    retry: RetryPolicy,
    backup_dir: PathBuf,
}

impl<'a> MergeExecutor<'a> {
    pub fn new(store: &'a Store, client: &'a dyn CrmClient, backup_dir: &Path) -> Self {
        Self {
            store,
            client,
            retry: RetryPolicy::default(),
            backup_dir: backup_dir.to_path_buf(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn execute(&self, request: &MergeRequest) -> Result<MergeReport> {
        let group = self
            .store
            .groups()
            .get_with_matches(request.group_id)?
            .ok_or_else(|| EngineError::NotFound(format!("group {}", request.group_id)))?;

        if group.group.status.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "group {} is already {}",
                group.group.id, group.group.status
            )));
        }
        if group.matches.len() < 2 {
            return Err(EngineError::InvariantViolation(format!(
                "group {} has fewer than two potential matches",
                group.group.id
            )));
        }

        let primary = request.primary_external_id.as_str();
        if !group
            .matches
            .iter()
            .any(|m| m.record_external_id == primary)
        {
            return Err(EngineError::InvariantViolation(format!(
                "record {primary} is not a member of group {}",
                group.group.id
            )));
        }

        let secondaries: Vec<String> = group
            .matches
            .iter()
            .map(|m| m.record_external_id.clone())
            .filter(|id| id != primary)
            .collect();
        if secondaries.is_empty() {
            return Err(EngineError::InvariantViolation(format!(
                "group {} has no records to absorb",
                group.group.id
            )));
        }

        // A record may not be the designated survivor of two live groups of
        // the same kind at once.
        let conflicting: Vec<GroupId> = self
            .store
            .groups()
            .live_groups_with_primary(group.group.kind, primary)?
            .into_iter()
            .filter(|id| *id != group.group.id)
            .collect();
        if let Some(other) = conflicting.first() {
            return Err(EngineError::InvariantViolation(format!(
                "record {primary} is already the primary of group {other}"
            )));
        }

        let kind = group.group.kind;
        let member_ids: Vec<String> = group
            .matches
            .iter()
            .map(|m| m.record_external_id.clone())
            .collect();
        let records = self.store.records().get_many(kind, &member_ids)?;
        let primary_record = records
            .iter()
            .find(|r| r.external_id() == primary)
            .ok_or_else(|| {
                EngineError::InvariantViolation(format!(
                    "primary record {primary} is missing from the store"
                ))
            })?;

        if request.dry_run {
            let preview = self.build_preview(&group, primary_record, &records, &secondaries)?;
            return Ok(MergeReport {
                group_id: group.group.id,
                primary: primary.to_string(),
                absorbed: secondaries,
                backup_path: None,
                dry_run: true,
                preview: Some(preview),
            });
        }

        let backup_path = if request.create_backup {
            Some(backup::write_backup(
                &self.backup_dir,
                time::now_ms(),
                &group,
                primary,
                &records,
            )?)
        } else {
            None
        };

        // Remote merges run one at a time; a failure aborts with later
        // secondaries untouched and the already-absorbed list attached.
        let mut absorbed: Vec<String> = Vec::with_capacity(secondaries.len());
        for secondary in &secondaries {
            let result = self
                .retry
                .run(|| self.client.merge(kind, primary, secondary));
            match result {
                Ok(()) => {
                    debug!(primary, secondary = secondary.as_str(), "remote merge ok");
                    absorbed.push(secondary.clone());
                }
                Err(source) => {
                    warn!(
                        primary,
                        secondary = secondary.as_str(),
                        error = %source,
                        absorbed = absorbed.len(),
                        "remote merge failed"
                    );
                    let note = merge_failure_note(&source);
                    if let Err(store_err) =
                        self.store.records().record_error(kind, secondary, &note)
                    {
                        warn!(error = %store_err, "failed to record merge error");
                    }
                    return Err(EngineError::External { absorbed, source });
                }
            }
        }

        let now = time::now_ms();
        let metadata = backup_path
            .as_deref()
            .map(|path| {
                serde_json::json!({ "backupPath": path.display().to_string() }).to_string()
            });
        let tx = self
            .store
            .connection()
            .unchecked_transaction()
            .map_err(crmsweep_store::error::StoreError::from)?;
        GroupsRepo::new(&tx).mark_merged(now, group.group.id, primary, MERGE_STRATEGY)?;
        MergeHistoryRepo::new(&tx).insert(
            now,
            MergeHistoryNew {
                group_id: group.group.id,
                primary_external_id: primary.to_string(),
                absorbed_external_ids: absorbed.clone(),
                kind,
                merge_strategy: Some(MERGE_STRATEGY.to_string()),
                metadata,
            },
        )?;
        let records_repo = RecordsRepo::new(&tx);
        for secondary in &absorbed {
            records_repo.delete(kind, secondary)?;
        }
        tx.commit().map_err(crmsweep_store::error::StoreError::from)?;

        Ok(MergeReport {
            group_id: group.group.id,
            primary: primary.to_string(),
            absorbed,
            backup_path,
            dry_run: false,
            preview: None,
        })
    }

    fn build_preview(
        &self,
        group: &GroupWithMatches,
        primary: &Record,
        records: &[Record],
        secondaries: &[String],
    ) -> Result<MergePreview> {
        let absorbed: Vec<&Record> = records
            .iter()
            .filter(|r| secondaries.iter().any(|id| id == r.external_id()))
            .collect();

        let mut estimated_changes = vec![
            format!(
                "{} record(s) merged into {}",
                absorbed.len(),
                primary.external_id()
            ),
            format!("group {} marked as merged", group.group.id),
            format!("{} local record(s) deleted after the merge", absorbed.len()),
        ];
        estimated_changes.extend(field_gains(primary, &absorbed));

        let mut warnings = Vec::new();
        if group.matches.len() > LARGE_MERGE_WARNING {
            warnings.push(format!(
                "large merge: {} records in one group",
                group.matches.len()
            ));
        }
        for record in records {
            let count = record.property_count();
            if count > MANY_PROPERTIES_WARNING {
                warnings.push(format!(
                    "record {} carries {count} custom properties",
                    record.external_id()
                ));
            }
        }
        for id in secondaries {
            if self
                .store
                .merge_history()
                .is_record_merged(group.group.kind, id)?
            {
                warnings.push(format!("record {id} was already absorbed by an earlier merge"));
            }
        }

        Ok(MergePreview {
            primary: RecordSummary::from_record(primary),
            records_to_merge: absorbed.iter().map(|r| RecordSummary::from_record(r)).collect(),
            estimated_changes,
            warnings,
        })
    }
}

/// Fields the primary would gain from absorbed records, field-by-field.
fn field_gains(primary: &Record, absorbed: &[&Record]) -> Vec<String> {
    let mut gains = Vec::new();
    let mut note = |field: &str, primary_value: &Option<String>, donor: &Record, value: &Option<String>| {
        let empty = primary_value
            .as_deref()
            .map_or(true, |v| v.trim().is_empty());
        if empty && value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            gains.push(format!(
                "primary gains {field} from {}",
                donor.external_id()
            ));
        }
    };
    for donor in absorbed {
        match (primary, donor) {
            (Record::Contact(p), Record::Contact(d)) => {
                note("email", &p.email, donor, &d.email);
                note("phone", &p.phone, donor, &d.phone);
                note("company", &p.company, donor, &d.company);
                note("job_title", &p.job_title, donor, &d.job_title);
            }
            (Record::Company(p), Record::Company(d)) => {
                note("domain", &p.domain, donor, &d.domain);
                note("phone", &p.phone, donor, &d.phone);
                note("city", &p.city, donor, &d.city);
                note("industry", &p.industry, donor, &d.industry);
            }
            _ => {}
        }
    }
    gains
}

fn merge_failure_note(err: &ClientError) -> String {
    match err.status_code() {
        Some(status) => format!("remote merge failed with status {status}"),
        None => format!("remote merge failed: {err}"),
    }
}
