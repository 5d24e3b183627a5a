use crate::error::Result;
use crmsweep_core::matching::keys;
use crmsweep_core::{Company, Contact, Record, RecordKind};
use rusqlite::{params, Connection, Row};

const CONTACT_COLUMNS: &str = "external_id, first_name, last_name, email, phone, company, \
     job_title, created_at, updated_at, properties";
const COMPANY_COLUMNS: &str = "external_id, name, domain, phone, city, state, industry, \
     created_at, updated_at, properties";

pub struct RecordsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> RecordsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert-or-replace keyed by external id. Normalized identity columns
    /// are recomputed on every write so exact matching always sees current
    /// values; error bookkeeping is reset because the row now reflects a
    /// fresh import.
    pub fn upsert(&self, record: &Record) -> Result<()> {
        record.validate()?;
        match record {
            Record::Contact(contact) => self.upsert_contact(contact),
            Record::Company(company) => self.upsert_company(company),
        }
    }

    fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        let email_norm = contact.email.as_deref().and_then(keys::email_key);
        let phone_norm = contact.phone.as_deref().and_then(keys::phone_key);
        self.conn.execute(
            "INSERT INTO contacts (external_id, first_name, last_name, email, phone, company, \
                 job_title, email_norm, phone_norm, created_at, updated_at, properties)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (external_id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 phone = excluded.phone,
                 company = excluded.company,
                 job_title = excluded.job_title,
                 email_norm = excluded.email_norm,
                 phone_norm = excluded.phone_norm,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at,
                 properties = excluded.properties,
                 retry_count = 0,
                 last_error = NULL;",
            params![
                contact.external_id,
                contact.first_name,
                contact.last_name,
                contact.email,
                contact.phone,
                contact.company,
                contact.job_title,
                email_norm,
                phone_norm,
                contact.created_at,
                contact.updated_at,
                contact.properties,
            ],
        )?;
        Ok(())
    }

    fn upsert_company(&self, company: &Company) -> Result<()> {
        let domain_norm = company.domain.as_deref().and_then(keys::domain_key);
        let phone_norm = company.phone.as_deref().and_then(keys::phone_key);
        self.conn.execute(
            "INSERT INTO companies (external_id, name, domain, phone, city, state, industry, \
                 domain_norm, phone_norm, created_at, updated_at, properties)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (external_id) DO UPDATE SET
                 name = excluded.name,
                 domain = excluded.domain,
                 phone = excluded.phone,
                 city = excluded.city,
                 state = excluded.state,
                 industry = excluded.industry,
                 domain_norm = excluded.domain_norm,
                 phone_norm = excluded.phone_norm,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at,
                 properties = excluded.properties,
                 retry_count = 0,
                 last_error = NULL;",
            params![
                company.external_id,
                company.name,
                company.domain,
                company.phone,
                company.city,
                company.state,
                company.industry,
                domain_norm,
                phone_norm,
                company.created_at,
                company.updated_at,
                company.properties,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, kind: RecordKind, external_id: &str) -> Result<Option<Record>> {
        let sql = match kind {
            RecordKind::Contact => {
                format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE external_id = ?1;")
            }
            RecordKind::Company => {
                format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE external_id = ?1;")
            }
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([external_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(record_from_row(kind, row)?))
        } else {
            Ok(None)
        }
    }

    /// Bulk lookup preserving input order; missing ids are skipped.
    pub fn get_many(&self, kind: RecordKind, external_ids: &[String]) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(external_ids.len());
        for external_id in external_ids {
            if let Some(record) = self.get(kind, external_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn count(&self, kind: RecordKind) -> Result<i64> {
        let sql = match kind {
            RecordKind::Contact => "SELECT COUNT(*) FROM contacts;",
            RecordKind::Company => "SELECT COUNT(*) FROM companies;",
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Recently-updated first; records without a source timestamp sort last.
    pub fn list(&self, kind: RecordKind, limit: Option<i64>, offset: i64) -> Result<Vec<Record>> {
        let sql = match kind {
            RecordKind::Contact => format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 ORDER BY (updated_at IS NULL) ASC, updated_at DESC, external_id ASC
                 LIMIT ?1 OFFSET ?2;"
            ),
            RecordKind::Company => format!(
                "SELECT {COMPANY_COLUMNS} FROM companies
                 ORDER BY (updated_at IS NULL) ASC, updated_at DESC, external_id ASC
                 LIMIT ?1 OFFSET ?2;"
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![limit.unwrap_or(-1), offset])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_row(kind, row)?);
        }
        Ok(records)
    }

    /// Every record of a kind in external-id order; the deterministic input
    /// for the fuzzy pass.
    pub fn list_all(&self, kind: RecordKind) -> Result<Vec<Record>> {
        let sql = match kind {
            RecordKind::Contact => {
                format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY external_id ASC;")
            }
            RecordKind::Company => {
                format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY external_id ASC;")
            }
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_row(kind, row)?);
        }
        Ok(records)
    }

    pub fn delete(&self, kind: RecordKind, external_id: &str) -> Result<()> {
        let sql = match kind {
            RecordKind::Contact => "DELETE FROM contacts WHERE external_id = ?1;",
            RecordKind::Company => "DELETE FROM companies WHERE external_id = ?1;",
        };
        self.conn.execute(sql, [external_id])?;
        Ok(())
    }

    /// Notes a failed remote operation against a record without touching its
    /// business fields.
    pub fn record_error(&self, kind: RecordKind, external_id: &str, message: &str) -> Result<()> {
        let sql = match kind {
            RecordKind::Contact => {
                "UPDATE contacts SET retry_count = retry_count + 1, last_error = ?2
                 WHERE external_id = ?1;"
            }
            RecordKind::Company => {
                "UPDATE companies SET retry_count = retry_count + 1, last_error = ?2
                 WHERE external_id = ?1;"
            }
        };
        self.conn.execute(sql, params![external_id, message])?;
        Ok(())
    }

    /// Exact identity groups over the normalized email column: member ids
    /// per shared key, members ordered `updated_at` descending (nulls last).
    pub fn contact_email_groups(&self) -> Result<Vec<Vec<String>>> {
        self.keyed_groups("contacts", "email_norm")
    }

    pub fn contact_phone_groups(&self) -> Result<Vec<Vec<String>>> {
        self.keyed_groups("contacts", "phone_norm")
    }

    pub fn company_domain_groups(&self) -> Result<Vec<Vec<String>>> {
        self.keyed_groups("companies", "domain_norm")
    }

    fn keyed_groups(&self, table: &str, column: &str) -> Result<Vec<Vec<String>>> {
        let sql = format!(
            "SELECT r.{column}, r.external_id
             FROM {table} r
             JOIN (SELECT {column} AS k FROM {table}
                   WHERE {column} IS NOT NULL AND {column} <> ''
                   GROUP BY {column} HAVING COUNT(*) >= 2) d
               ON r.{column} = d.k
             ORDER BY r.{column} ASC, (r.updated_at IS NULL) ASC,
                      r.updated_at DESC, r.external_id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut current_key: Option<String> = None;
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let external_id: String = row.get(1)?;
            if current_key.as_deref() != Some(key.as_str()) {
                groups.push(Vec::new());
                current_key = Some(key);
            }
            if let Some(group) = groups.last_mut() {
                group.push(external_id);
            }
        }
        Ok(groups)
    }

    /// Contacts with no usable email, candidates for the name identity key.
    pub fn contacts_without_email(&self) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE email IS NULL OR TRIM(email) = ''
             ORDER BY external_id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(contact_from_row(row)?);
        }
        Ok(contacts)
    }
}

fn record_from_row(kind: RecordKind, row: &Row<'_>) -> Result<Record> {
    Ok(match kind {
        RecordKind::Contact => Record::Contact(contact_from_row(row)?),
        RecordKind::Company => Record::Company(company_from_row(row)?),
    })
}

fn contact_from_row(row: &Row<'_>) -> Result<Contact> {
    Ok(Contact {
        external_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        job_title: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        properties: row.get(9)?,
    })
}

fn company_from_row(row: &Row<'_>) -> Result<Company> {
    Ok(Company {
        external_id: row.get(0)?,
        name: row.get(1)?,
        domain: row.get(2)?,
        phone: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        industry: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        properties: row.get(9)?,
    })
}
