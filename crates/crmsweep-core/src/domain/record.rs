use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Contact,
    Company,
}

impl RecordKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Contact => "contact",
            RecordKind::Company => "company",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "contact" => Ok(RecordKind::Contact),
            "company" => Ok(RecordKind::Company),
            _ => Err(CoreError::InvalidRecordKind(value.to_string())),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CRM person record as captured from the source system. Business fields
/// are optional; `properties` is the source's raw key/value map, preserved
/// verbatim as a JSON object string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub properties: Option<String>,
}

impl Contact {
    /// `first last` when both parts are present; the composite-name field
    /// used by the pair scorer.
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.as_deref()?.trim();
        let last = self.last_name.as_deref()?.trim();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        Some(format!("{first} {last}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub external_id: String,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub industry: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub properties: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Contact(Contact),
    Company(Company),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Contact(_) => RecordKind::Contact,
            Record::Company(_) => RecordKind::Company,
        }
    }

    pub fn external_id(&self) -> &str {
        match self {
            Record::Contact(c) => &c.external_id,
            Record::Company(c) => &c.external_id,
        }
    }

    pub fn created_at(&self) -> Option<i64> {
        match self {
            Record::Contact(c) => c.created_at,
            Record::Company(c) => c.created_at,
        }
    }

    pub fn updated_at(&self) -> Option<i64> {
        match self {
            Record::Contact(c) => c.updated_at,
            Record::Company(c) => c.updated_at,
        }
    }

    pub fn properties(&self) -> Option<&str> {
        match self {
            Record::Contact(c) => c.properties.as_deref(),
            Record::Company(c) => c.properties.as_deref(),
        }
    }

    /// Best human label available: name, then email/domain, then the
    /// external id.
    pub fn display_name(&self) -> String {
        match self {
            Record::Contact(c) => c
                .full_name()
                .or_else(|| c.first_name.clone())
                .or_else(|| c.last_name.clone())
                .or_else(|| c.email.clone())
                .unwrap_or_else(|| c.external_id.clone()),
            Record::Company(c) => c
                .name
                .clone()
                .or_else(|| c.domain.clone())
                .unwrap_or_else(|| c.external_id.clone()),
        }
    }

    /// Number of keys in the `properties` blob. Malformed or absent blobs
    /// count as zero; bad source data must never fail analysis.
    pub fn property_count(&self) -> usize {
        let Some(raw) = self.properties() else {
            return 0;
        };
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.external_id().trim().is_empty() {
            return Err(CoreError::EmptyExternalId);
        }
        Ok(())
    }
}
