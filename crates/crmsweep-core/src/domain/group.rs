use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    /// Maps a composite fuzzy score (0..=100) onto a review band. Exact
    /// groups are always `High` and never go through this mapping.
    pub fn from_score(score: u8) -> Self {
        if score >= 95 {
            Confidence::High
        } else if score >= 85 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl FromStr for Confidence {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            _ => Err(CoreError::InvalidConfidence(value.to_string())),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Pending,
    Reviewed,
    Merged,
    Dismissed,
}

impl GroupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Reviewed => "reviewed",
            GroupStatus::Merged => "merged",
            GroupStatus::Dismissed => "dismissed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, GroupStatus::Merged | GroupStatus::Dismissed)
    }

    /// The group lifecycle: pending -> reviewed -> merged, with dismiss
    /// allowed from any live state and merge allowed straight from pending.
    pub fn can_transition_to(self, next: GroupStatus) -> bool {
        match (self, next) {
            (GroupStatus::Pending, GroupStatus::Reviewed)
            | (GroupStatus::Pending, GroupStatus::Merged)
            | (GroupStatus::Pending, GroupStatus::Dismissed)
            | (GroupStatus::Reviewed, GroupStatus::Merged)
            | (GroupStatus::Reviewed, GroupStatus::Dismissed) => true,
            _ => false,
        }
    }

    pub const fn all() -> &'static [GroupStatus] {
        &[
            GroupStatus::Pending,
            GroupStatus::Reviewed,
            GroupStatus::Merged,
            GroupStatus::Dismissed,
        ]
    }
}

impl FromStr for GroupStatus {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(GroupStatus::Pending),
            "reviewed" => Ok(GroupStatus::Reviewed),
            "merged" => Ok(GroupStatus::Merged),
            "dismissed" => Ok(GroupStatus::Dismissed),
            _ => Err(CoreError::InvalidGroupStatus(value.to_string())),
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field: String,
    pub score: u8,
}

/// The structured descriptor persisted alongside every potential match:
/// which fields contributed to the pair score and the per-field sub-scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchedFields {
    pub fields: Vec<String>,
    pub scores: Vec<FieldScore>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MatchedFieldsWire {
    Object {
        fields: Vec<String>,
        #[serde(default)]
        scores: Vec<FieldScore>,
    },
    // Early databases stored a bare field-name array.
    Legacy(Vec<String>),
}

impl MatchedFields {
    pub fn new(fields: Vec<String>, scores: Vec<FieldScore>) -> Self {
        Self { fields, scores }
    }

    /// Accepts both the current object form and the legacy bare array.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let wire: MatchedFieldsWire = serde_json::from_str(raw)
            .map_err(|err| CoreError::InvalidMatchedFields(err.to_string()))?;
        Ok(match wire {
            MatchedFieldsWire::Object { fields, scores } => Self { fields, scores },
            MatchedFieldsWire::Legacy(fields) => Self {
                fields,
                scores: Vec::new(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Confidence, FieldScore, GroupStatus, MatchedFields};
    use std::str::FromStr;

    #[test]
    fn status_round_trip() {
        for status in GroupStatus::all() {
            let parsed = GroupStatus::from_str(status.as_str()).expect("parse status");
            assert_eq!(*status, parsed);
        }
        assert!(GroupStatus::from_str("open").is_err());
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        for terminal in [GroupStatus::Merged, GroupStatus::Dismissed] {
            for next in GroupStatus::all() {
                assert!(!terminal.can_transition_to(*next));
            }
        }
        assert!(GroupStatus::Pending.can_transition_to(GroupStatus::Merged));
        assert!(GroupStatus::Reviewed.can_transition_to(GroupStatus::Dismissed));
        assert!(!GroupStatus::Reviewed.can_transition_to(GroupStatus::Pending));
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(Confidence::from_score(100), Confidence::High);
        assert_eq!(Confidence::from_score(95), Confidence::High);
        assert_eq!(Confidence::from_score(94), Confidence::Medium);
        assert_eq!(Confidence::from_score(85), Confidence::Medium);
        assert_eq!(Confidence::from_score(84), Confidence::Low);
    }

    #[test]
    fn matched_fields_round_trip() {
        let descriptor = MatchedFields::new(
            vec!["email".to_string(), "last_name".to_string()],
            vec![
                FieldScore {
                    field: "email".to_string(),
                    score: 100,
                },
                FieldScore {
                    field: "last_name".to_string(),
                    score: 88,
                },
            ],
        );
        let raw = serde_json::to_string(&descriptor).expect("encode");
        let parsed = MatchedFields::parse(&raw).expect("parse");
        assert_eq!(descriptor, parsed);
    }

    #[test]
    fn matched_fields_accepts_legacy_array() {
        let parsed = MatchedFields::parse(r#"["email","phone"]"#).expect("parse legacy");
        assert_eq!(parsed.fields, vec!["email", "phone"]);
        assert!(parsed.scores.is_empty());
    }

    #[test]
    fn matched_fields_rejects_garbage() {
        assert!(MatchedFields::parse("{\"nope\":1}").is_err());
        assert!(MatchedFields::parse("not json").is_err());
    }
}
