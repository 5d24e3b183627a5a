//! Union-find consolidation: collapses transitively connected pairs into
//! groups so a record never belongs to two live groups at once.

use crate::domain::{FieldScore, MatchedFields};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEdge {
    pub a: String,
    pub b: String,
    /// Composite score 0..=100; exact-key edges carry 100.
    pub score: u8,
    pub matched: Vec<String>,
    pub field_scores: Vec<FieldScore>,
    pub exact: bool,
}

impl PairEdge {
    pub fn exact(a: impl Into<String>, b: impl Into<String>, key: &str) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            score: 100,
            matched: vec![key.to_string()],
            field_scores: vec![FieldScore {
                field: key.to_string(),
                score: 100,
            }],
            exact: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedGroup {
    /// Member external ids, sorted.
    pub members: Vec<String>,
    /// Rounded mean of the contributing edges' scores.
    pub score: u8,
    /// Union of the contributing edges' matched fields; per-field score is
    /// the maximum seen across edges.
    pub matched_fields: MatchedFields,
    /// True when every contributing edge was an exact-key match.
    pub all_exact: bool,
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Collapses edges into groups. Every edge endpoint belongs to exactly one
/// output group; groups and their member lists are sorted so the result is
/// deterministic for a given edge set.
pub fn consolidate(edges: &[PairEdge]) -> Vec<ConsolidatedGroup> {
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in edges {
        let next = index.len();
        index.entry(edge.a.as_str()).or_insert(next);
        let next = index.len();
        index.entry(edge.b.as_str()).or_insert(next);
    }

    let mut sets = DisjointSet::new(index.len());
    for edge in edges {
        sets.union(index[edge.a.as_str()], index[edge.b.as_str()]);
    }

    struct Accum {
        members: BTreeSet<String>,
        score_sum: u64,
        edge_count: u64,
        matched: BTreeSet<String>,
        field_scores: BTreeMap<String, u8>,
        all_exact: bool,
    }

    let mut groups: BTreeMap<usize, Accum> = BTreeMap::new();
    for edge in edges {
        let root = sets.find(index[edge.a.as_str()]);
        let accum = groups.entry(root).or_insert_with(|| Accum {
            members: BTreeSet::new(),
            score_sum: 0,
            edge_count: 0,
            matched: BTreeSet::new(),
            field_scores: BTreeMap::new(),
            all_exact: true,
        });
        accum.members.insert(edge.a.clone());
        accum.members.insert(edge.b.clone());
        accum.score_sum += u64::from(edge.score);
        accum.edge_count += 1;
        accum.matched.extend(edge.matched.iter().cloned());
        for fs in &edge.field_scores {
            let entry = accum.field_scores.entry(fs.field.clone()).or_insert(0);
            *entry = (*entry).max(fs.score);
        }
        accum.all_exact &= edge.exact;
    }

    let mut out: Vec<ConsolidatedGroup> = groups
        .into_values()
        .filter(|accum| accum.members.len() >= 2)
        .map(|accum| ConsolidatedGroup {
            members: accum.members.into_iter().collect(),
            score: ((accum.score_sum as f64) / (accum.edge_count as f64)).round() as u8,
            matched_fields: MatchedFields::new(
                accum.matched.into_iter().collect(),
                accum
                    .field_scores
                    .into_iter()
                    .map(|(field, score)| FieldScore { field, score })
                    .collect(),
            ),
            all_exact: accum.all_exact,
        })
        .collect();
    out.sort_by(|a, b| a.members.cmp(&b.members));
    out
}

#[cfg(test)]
mod tests {
    use super::{consolidate, PairEdge};
    use crate::domain::FieldScore;

    fn fuzzy(a: &str, b: &str, score: u8) -> PairEdge {
        PairEdge {
            a: a.to_string(),
            b: b.to_string(),
            score,
            matched: vec!["last_name".to_string()],
            field_scores: vec![FieldScore {
                field: "last_name".to_string(),
                score,
            }],
            exact: false,
        }
    }

    #[test]
    fn transitive_pairs_collapse_into_one_group() {
        let edges = vec![fuzzy("A", "B", 88), fuzzy("B", "C", 85), fuzzy("D", "E", 90)];
        let groups = consolidate(&edges);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec!["A", "B", "C"]);
        assert_eq!(groups[0].score, 87); // mean of 88 and 85, rounded
        assert_eq!(groups[1].members, vec!["D", "E"]);
        assert_eq!(groups[1].score, 90);
    }

    #[test]
    fn exact_and_fuzzy_edges_consolidate() {
        let edges = vec![PairEdge::exact("A", "B", "email"), fuzzy("B", "C", 86)];
        let groups = consolidate(&edges);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["A", "B", "C"]);
        assert!(!groups[0].all_exact);
        assert!(groups[0]
            .matched_fields
            .fields
            .iter()
            .any(|f| f == "email"));
        assert!(groups[0]
            .matched_fields
            .fields
            .iter()
            .any(|f| f == "last_name"));
    }

    #[test]
    fn exact_only_group_is_flagged() {
        let edges = vec![PairEdge::exact("A", "B", "email")];
        let groups = consolidate(&edges);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].all_exact);
        assert_eq!(groups[0].score, 100);
    }

    #[test]
    fn field_scores_keep_the_maximum() {
        let mut low = fuzzy("A", "B", 75);
        low.field_scores[0].score = 75;
        let mut high = fuzzy("B", "C", 92);
        high.field_scores[0].score = 92;
        let groups = consolidate(&[low, high]);
        assert_eq!(groups[0].matched_fields.scores.len(), 1);
        assert_eq!(groups[0].matched_fields.scores[0].score, 92);
    }

    #[test]
    fn no_edges_no_groups() {
        assert!(consolidate(&[]).is_empty());
    }
}
