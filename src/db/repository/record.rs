//! Business record access. Every query is scoped by tenant id in SQL;
//! callers in the context layer re-check ownership on the returned row.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Map;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Vertical;

/// A vertical-shaped business record as stored.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vertical: Vertical,
    pub display_name: String,
    /// Vertical-specific fields, insertion order preserved.
    pub fields: Map<String, serde_json::Value>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parse_record(
    (id, tenant_id, vertical, display_name, fields): (String, String, String, String, String),
) -> Result<RecordRow, DatabaseError> {
    let id = Uuid::parse_str(&id).map_err(|_| DatabaseError::InvalidEnum {
        field: "records.id".into(),
        value: id.clone(),
    })?;
    let tenant_id = Uuid::parse_str(&tenant_id).map_err(|_| DatabaseError::InvalidEnum {
        field: "records.tenant_id".into(),
        value: tenant_id.clone(),
    })?;
    let vertical = Vertical::parse(&vertical).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "records.vertical".into(),
        value: vertical.clone(),
    })?;
    let fields: Map<String, serde_json::Value> = serde_json::from_str(&fields)?;
    Ok(RecordRow {
        id,
        tenant_id,
        vertical,
        display_name,
        fields,
    })
}

const SELECT_COLUMNS: &str = "id, tenant_id, vertical, display_name, fields";

/// Fetch a single record, scoped by tenant and vertical.
/// `Ok(None)` covers both "does not exist" and "belongs to someone else".
pub fn get_record(
    conn: &Connection,
    vertical: Vertical,
    record_id: &Uuid,
    tenant_id: &Uuid,
) -> Result<Option<RecordRow>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM records
                 WHERE id = ?1 AND tenant_id = ?2 AND vertical = ?3"
            ),
            params![record_id.to_string(), tenant_id.to_string(), vertical.as_str()],
            row_to_record,
        )
        .optional()?;
    raw.map(parse_record).transpose()
}

/// List a tenant's records in a vertical, newest first.
pub fn list_records(
    conn: &Connection,
    vertical: Vertical,
    tenant_id: &Uuid,
    limit: u32,
) -> Result<Vec<RecordRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM records
         WHERE tenant_id = ?1 AND vertical = ?2
         ORDER BY created_at DESC
         LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![tenant_id.to_string(), vertical.as_str(), limit],
        row_to_record,
    )?;

    let mut records = Vec::new();
    for row in rows {
        records.push(parse_record(row?)?);
    }
    Ok(records)
}

/// Insert a record owned by the given tenant.
pub fn insert_record(
    conn: &Connection,
    tenant_id: &Uuid,
    vertical: Vertical,
    display_name: &str,
    fields: &Map<String, serde_json::Value>,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO records (id, tenant_id, vertical, display_name, fields, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id.to_string(),
            tenant_id.to_string(),
            vertical.as_str(),
            display_name,
            serde_json::to_string(fields)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(id)
}
