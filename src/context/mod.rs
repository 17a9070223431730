//! Tenant-scoped retrieval of business records and stored document text
//! for prompt assembly.
//!
//! Queries are tenant-scoped in SQL, and the fetcher re-checks ownership
//! on every row it hands out. A failed recheck is treated exactly like a
//! missing record, so callers cannot distinguish "not yours" from
//! "does not exist".

use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{extraction, record};
use crate::db::{DatabaseError, Storage};
use crate::models::Vertical;

/// A record formatted for prompt context.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    pub record_id: Uuid,
    pub label: String,
    pub lines: Vec<(String, String)>,
}

impl ContextBlock {
    /// Render as a labelled field list, one `key: value` per line.
    pub fn format_for_prompt(&self) -> String {
        let mut out = format!("## {}\n", self.label);
        for (key, value) in &self.lines {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out
    }
}

/// Listing entry for the records endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub display_name: String,
    pub vertical: Vertical,
}

/// Sanitized stored document attached to a record.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub filename: String,
    pub sanitized_text: String,
}

pub struct ContextFetcher {
    db: Storage,
}

impl ContextFetcher {
    pub fn new(db: Storage) -> Self {
        Self { db }
    }

    /// Fetch one record for the tenant. `Ok(None)` means not found,
    /// wrong vertical, or owned by someone else.
    pub fn fetch_record(
        &self,
        vertical: Vertical,
        record_id: &Uuid,
        tenant_id: &Uuid,
    ) -> Result<Option<ContextBlock>, DatabaseError> {
        let conn = self.db.conn()?;
        let row = match record::get_record(&conn, vertical, record_id, tenant_id)? {
            Some(row) => row,
            None => return Ok(None),
        };

        // The SQL already filters on tenant_id; this recheck guards
        // against a future query regression leaking rows across tenants.
        if row.tenant_id != *tenant_id {
            tracing::error!(
                %record_id,
                "ownership recheck failed: query returned a foreign row"
            );
            return Ok(None);
        }

        Ok(Some(Self::to_block(row)))
    }

    /// List the tenant's records in a vertical, newest first.
    pub fn list_records(
        &self,
        vertical: Vertical,
        tenant_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<RecordSummary>, DatabaseError> {
        let conn = self.db.conn()?;
        let rows = record::list_records(&conn, vertical, tenant_id, limit)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.tenant_id == *tenant_id)
            .map(|row| RecordSummary {
                id: row.id,
                display_name: row.display_name,
                vertical: row.vertical,
            })
            .collect())
    }

    /// Sanitized texts of documents previously uploaded against a record.
    pub fn fetch_documents(
        &self,
        record_id: &Uuid,
        tenant_id: &Uuid,
    ) -> Result<Vec<DocumentContext>, DatabaseError> {
        let conn = self.db.conn()?;
        let rows = extraction::sanitized_texts_for_record(&conn, tenant_id, record_id)?;
        Ok(rows
            .into_iter()
            .map(|(filename, sanitized_text)| DocumentContext {
                filename,
                sanitized_text,
            })
            .collect())
    }

    fn to_block(row: record::RecordRow) -> ContextBlock {
        let label = format!("{}: {}", row.vertical.record_label(), row.display_name);
        let lines = row
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), json_value_to_line(value)))
            .collect();
        ContextBlock {
            record_id: row.id,
            label,
            lines,
        }
    }
}

fn json_value_to_line(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
