use crate::cancel::CancelToken;
use crate::error::{EngineError, Result};
use crate::progress::{ProgressSink, Stage};
use crate::{exact, fuzzy};
use crmsweep_core::matching::{consolidate, select_golden, ConsolidatedGroup};
use crmsweep_core::{time, Confidence, Record, RecordKind};
use crmsweep_store::repo::{GroupNew, MatchNew, StatusCounts};
use crmsweep_store::Store;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

pub const DEFAULT_MIN_SCORE: u8 = 80;
pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub kind: RecordKind,
    pub run_exact: bool,
    pub run_fuzzy: bool,
    /// Composite threshold for fuzzy pairs, 0..=100.
    pub min_score: u8,
    /// Scored pairs between progress callbacks inside one bucket.
    pub chunk_size: usize,
    /// Drop existing pending groups of this kind before persisting.
    pub clear_existing: bool,
}

impl AnalysisConfig {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            run_exact: true,
            run_fuzzy: true,
            min_score: DEFAULT_MIN_SCORE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            clear_existing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub kind: RecordKind,
    pub total_records: i64,
    pub exact_groups: usize,
    pub fuzzy_groups: usize,
    pub total_groups: usize,
    pub by_confidence: ConfidenceBreakdown,
    /// Group counts per lifecycle status for this kind after the run.
    pub by_status: StatusCounts,
    pub pairs_scored: usize,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

/// Orchestrates one batch analysis run: exact edges, fuzzy edges, a single
/// union-find consolidation, then per-group persistence.
pub struct DedupEngine<'a> {
    store: &'a Store,
}

impl<'a> DedupEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn run(
        &self,
        config: &AnalysisConfig,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<AnalysisSummary> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let started = Instant::now();
        let kind = config.kind;

        if config.clear_existing {
            let cleared = self.store.groups().clear_pending(kind)?;
            debug!(kind = %kind, cleared, "cleared pending groups");
        }

        let total_records = self.store.records().count(kind)?;
        let mut edges = Vec::new();

        if config.run_exact {
            progress.progress(Stage::ExactMatch, 0, 1);
            let exact_edges = exact::exact_edges(self.store, kind)?;
            debug!(kind = %kind, edges = exact_edges.len(), "exact pass complete");
            edges.extend(exact_edges);
            progress.progress(Stage::ExactMatch, 1, 1);
        }

        let mut cancelled = false;
        let mut pairs_scored = 0;
        if config.run_fuzzy && !cancel.is_cancelled() {
            let records = self.store.records().list_all(kind)?;
            let outcome = fuzzy::fuzzy_edges(
                &records,
                config.min_score,
                config.chunk_size,
                progress,
                cancel,
            );
            debug!(
                kind = %kind,
                buckets = outcome.buckets_total,
                pairs = outcome.pairs_scored,
                edges = outcome.edges.len(),
                cancelled = outcome.cancelled,
                "fuzzy pass complete"
            );
            cancelled = outcome.cancelled;
            pairs_scored = outcome.pairs_scored;
            edges.extend(outcome.edges);
        } else if config.run_fuzzy {
            cancelled = true;
        }

        let groups = consolidate(&edges);

        let mut summary = AnalysisSummary {
            kind,
            total_records,
            exact_groups: 0,
            fuzzy_groups: 0,
            total_groups: 0,
            by_confidence: ConfidenceBreakdown::default(),
            by_status: StatusCounts::default(),
            pairs_scored,
            elapsed_ms: 0,
            cancelled,
        };

        // Exact-only groups persist before any fuzzy-containing group.
        let (exact_groups, fuzzy_groups): (Vec<_>, Vec<_>) =
            groups.into_iter().partition(|g| g.all_exact);
        for group in exact_groups.iter().chain(fuzzy_groups.iter()) {
            if self.persist_group(kind, group)? {
                summary.total_groups += 1;
                if group.all_exact {
                    summary.exact_groups += 1;
                } else {
                    summary.fuzzy_groups += 1;
                }
                let confidence = group_confidence(group);
                match confidence {
                    Confidence::High => summary.by_confidence.high += 1,
                    Confidence::Medium => summary.by_confidence.medium += 1,
                    Confidence::Low => summary.by_confidence.low += 1,
                }
            }
        }

        summary.by_status = self.store.groups().status_counts(kind)?;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            kind = %kind,
            total = summary.total_groups,
            exact = summary.exact_groups,
            fuzzy = summary.fuzzy_groups,
            cancelled = summary.cancelled,
            "analysis complete"
        );
        Ok(summary)
    }

    /// Materializes one consolidated group. Membership is re-validated
    /// against the store at creation time; a group that no longer has two
    /// live records is skipped rather than persisted.
    fn persist_group(&self, kind: RecordKind, group: &ConsolidatedGroup) -> Result<bool> {
        let records = self.store.records().get_many(kind, &group.members)?;
        if records.len() < 2 {
            debug!(
                members = group.members.len(),
                found = records.len(),
                "skipping group with missing records"
            );
            return Ok(false);
        }

        let mut ordered: Vec<&Record> = records.iter().collect();
        // Presentation order: updated_at descending, nulls last.
        ordered.sort_by(|a, b| match (a.updated_at(), b.updated_at()) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.external_id().cmp(b.external_id())),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.external_id().cmp(b.external_id()),
        });

        let golden = select_golden(&ordered)
            .map(|r| r.external_id().to_string())
            .ok_or_else(|| {
                EngineError::InvariantViolation("group has no members to select from".to_string())
            })?;

        let confidence = group_confidence(group);
        let match_score = if group.all_exact {
            1.0
        } else {
            f64::from(group.score) / 100.0
        };

        let matches = ordered
            .iter()
            .map(|record| MatchNew {
                record_external_id: record.external_id().to_string(),
                match_score,
                matched_fields: group.matched_fields.clone(),
                is_primary: record.external_id() == golden,
            })
            .collect();

        self.store.groups().create(
            time::now_ms(),
            GroupNew {
                kind,
                confidence,
                golden_external_id: Some(golden),
                matches,
            },
        )?;
        Ok(true)
    }
}

fn group_confidence(group: &ConsolidatedGroup) -> Confidence {
    if group.all_exact {
        Confidence::High
    } else {
        Confidence::from_score(group.score)
    }
}
