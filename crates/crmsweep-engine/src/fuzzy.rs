//! The fuzzy pass: blocking buckets, pair scoring, threshold filtering.

use crate::cancel::CancelToken;
use crate::progress::{ProgressSink, Stage};
use crmsweep_core::matching::{build_buckets, score_pair, PairEdge};
use crmsweep_core::Record;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FuzzyOutcome {
    pub edges: Vec<PairEdge>,
    pub buckets_total: usize,
    pub buckets_done: usize,
    pub pairs_scored: usize,
    pub cancelled: bool,
}

/// Scores every within-bucket pair once (pairs sharing several tags are
/// deduplicated on the unordered id tuple) and keeps pairs at or above
/// `min_score`. Progress fires after every bucket and, inside large
/// buckets, after every `chunk_size` scored pairs. Cancellation is honored
/// between buckets so the current bucket always completes.
pub fn fuzzy_edges(
    records: &[Record],
    min_score: u8,
    chunk_size: usize,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> FuzzyOutcome {
    let chunk_size = chunk_size.max(1);
    let buckets = build_buckets(records);
    let mut outcome = FuzzyOutcome {
        buckets_total: buckets.len(),
        ..FuzzyOutcome::default()
    };

    let mut seen: HashSet<(String, String)> = HashSet::new();
    for (tag, members) in &buckets {
        if cancel.is_cancelled() {
            debug!(tag = %tag, done = outcome.buckets_done, "fuzzy pass cancelled");
            outcome.cancelled = true;
            return outcome;
        }
        let mut since_progress = 0usize;
        for (i, a) in members.iter().enumerate() {
            for b in members.iter().skip(i + 1) {
                let key = pair_key(a.external_id(), b.external_id());
                if !seen.insert(key) {
                    continue;
                }
                outcome.pairs_scored += 1;
                since_progress += 1;
                if since_progress >= chunk_size {
                    progress.progress(Stage::FuzzyMatch, outcome.buckets_done, outcome.buckets_total);
                    since_progress = 0;
                }
                let Some(score) = score_pair(a, b) else {
                    continue;
                };
                if score.composite < min_score {
                    continue;
                }
                outcome.edges.push(PairEdge {
                    a: a.external_id().to_string(),
                    b: b.external_id().to_string(),
                    score: score.composite,
                    matched: score.matched,
                    field_scores: score.scores,
                    exact: false,
                });
            }
        }
        outcome.buckets_done += 1;
        progress.progress(Stage::FuzzyMatch, outcome.buckets_done, outcome.buckets_total);
    }
    outcome
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
