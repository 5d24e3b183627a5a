use crate::error::{ClientError, Result};
use crate::{AccountInfo, CrmClient, RecordPages};
use chrono::DateTime;
use crmsweep_core::{Company, Contact, Record, RecordKind};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const PAGE_LIMIT: u32 = 100;
const USER_AGENT: &str = concat!("crmsweep/", env!("CARGO_PKG_VERSION"));

const CONTACT_PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "email",
    "phone",
    "company",
    "jobtitle",
];
const COMPANY_PROPERTIES: &[&str] = &["name", "domain", "phone", "city", "state", "industry"];

/// Blocking CRM-v3 style client with bearer-token auth.
pub struct HttpCrmClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl HttpCrmClient {
    pub fn new(base_url: &str, token: String) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn objects_url(&self, kind: RecordKind) -> Result<Url> {
        let path = match kind {
            RecordKind::Contact => "crm/v3/objects/contacts",
            RecordKind::Company => "crm/v3/objects/companies",
        };
        Ok(self.base_url.join(path)?)
    }

    fn fetch_page(&self, kind: RecordKind, after: Option<&str>) -> Result<PageResponse> {
        let mut url = self.objects_url(kind)?;
        let properties = match kind {
            RecordKind::Contact => CONTACT_PROPERTIES,
            RecordKind::Company => COMPANY_PROPERTIES,
        };
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &PAGE_LIMIT.to_string());
            query.append_pair("properties", &properties.join(","));
            if let Some(after) = after {
                query.append_pair("after", after);
            }
        }
        let response = self.http.get(url).bearer_auth(&self.token).send()?;
        let response = check_status(response)?;
        let page: PageResponse = response
            .json()
            .map_err(|err| ClientError::Parse(err.to_string()))?;
        Ok(page)
    }
}

impl CrmClient for HttpCrmClient {
    fn account_info(&self) -> Result<AccountInfo> {
        let url = self.base_url.join("account-info/v3/details")?;
        let response = self.http.get(url).bearer_auth(&self.token).send()?;
        let response = check_status(response)?;
        let details: AccountDetails = response
            .json()
            .map_err(|err| ClientError::Parse(err.to_string()))?;
        Ok(AccountInfo {
            portal_id: details.portal_id,
        })
    }

    fn fetch_all(&self, kind: RecordKind) -> RecordPages<'_> {
        Box::new(PagesIter {
            client: self,
            kind,
            after: None,
            done: false,
        })
    }

    fn merge(&self, kind: RecordKind, primary_id: &str, secondary_id: &str) -> Result<()> {
        let mut url = self.objects_url(kind)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Parse("base url cannot be a base".to_string()))?
            .push("merge");
        let body = serde_json::json!({
            "primaryObjectId": primary_id,
            "objectIdToMerge": secondary_id,
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

struct PagesIter<'a> {
    client: &'a HttpCrmClient,
    kind: RecordKind,
    after: Option<String>,
    done: bool,
}

impl Iterator for PagesIter<'_> {
    type Item = Result<Vec<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = match self.client.fetch_page(self.kind, self.after.as_deref()) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        self.after = page.paging.and_then(|p| p.next).map(|n| n.after);
        if self.after.is_none() {
            self.done = true;
        }
        let records = page
            .results
            .into_iter()
            .map(|api| record_from_api(self.kind, api))
            .collect();
        Some(Ok(records))
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut message = response.text().unwrap_or_default();
    message.truncate(512);
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

#[derive(Debug, Deserialize)]
struct AccountDetails {
    #[serde(rename = "portalId")]
    portal_id: i64,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    results: Vec<ApiRecord>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
struct PagingNext {
    after: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<String>,
}

fn record_from_api(kind: RecordKind, api: ApiRecord) -> Record {
    let prop = |key: &str| -> Option<String> {
        match api.properties.get(key) {
            Some(serde_json::Value::String(value)) if !value.trim().is_empty() => {
                Some(value.clone())
            }
            _ => None,
        }
    };
    let created_at = api.created_at.as_deref().and_then(parse_instant);
    let updated_at = api.updated_at.as_deref().and_then(parse_instant);
    // The raw property map rides along verbatim.
    let properties = serde_json::to_string(&api.properties).ok();

    match kind {
        RecordKind::Contact => Record::Contact(Contact {
            external_id: api.id,
            first_name: prop("firstname"),
            last_name: prop("lastname"),
            email: prop("email"),
            phone: prop("phone"),
            company: prop("company"),
            job_title: prop("jobtitle"),
            created_at,
            updated_at,
            properties,
        }),
        RecordKind::Company => Record::Company(Company {
            external_id: api.id,
            name: prop("name"),
            domain: prop("domain"),
            phone: prop("phone"),
            city: prop("city"),
            state: prop("state"),
            industry: prop("industry"),
            created_at,
            updated_at,
            properties,
        }),
    }
}

/// Lenient ISO-8601 parse; an unreadable timestamp degrades to `None`
/// rather than failing the page.
fn parse_instant(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::{record_from_api, ApiRecord, PageResponse};
    use crmsweep_core::{Record, RecordKind};

    #[test]
    fn parses_a_contact_page() {
        let raw = r#"{
            "results": [
                {
                    "id": "101",
                    "properties": {"firstname": "Ada", "email": "ada@x.com", "phone": ""},
                    "createdAt": "2023-11-14T22:13:20.000Z",
                    "updatedAt": "2023-11-15T00:00:00.000Z"
                }
            ],
            "paging": {"next": {"after": "101"}}
        }"#;
        let page: PageResponse = serde_json::from_str(raw).expect("parse page");
        assert_eq!(page.results.len(), 1);
        assert_eq!(
            page.paging
                .and_then(|p| p.next)
                .map(|n| n.after)
                .as_deref(),
            Some("101")
        );

        let record = record_from_api(RecordKind::Contact, page.results.into_iter().next().unwrap());
        let Record::Contact(contact) = record else {
            panic!("expected contact");
        };
        assert_eq!(contact.external_id, "101");
        assert_eq!(contact.first_name.as_deref(), Some("Ada"));
        // Empty strings are treated as absent.
        assert_eq!(contact.phone, None);
        assert_eq!(contact.created_at, Some(1_700_000_000_000));
        assert!(contact.properties.expect("blob").contains("firstname"));
    }

    #[test]
    fn bad_timestamps_degrade_to_none() {
        let api = ApiRecord {
            id: "7".to_string(),
            properties: serde_json::Map::new(),
            created_at: Some("yesterday".to_string()),
            updated_at: None,
        };
        let record = record_from_api(RecordKind::Company, api);
        assert_eq!(record.created_at(), None);
        assert_eq!(record.external_id(), "7");
    }

    #[test]
    fn last_page_has_no_cursor() {
        let raw = r#"{"results": []}"#;
        let page: PageResponse = serde_json::from_str(raw).expect("parse page");
        assert!(page.results.is_empty());
        assert!(page.paging.is_none());
    }
}
