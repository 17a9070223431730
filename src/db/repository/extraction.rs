//! Persistence for sanitized document extractions. Raw extracted text is
//! never written here; the sanitizer runs before any insert.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::extraction::ExtractionMethod;

/// A stored extraction, as returned by listings.
#[derive(Debug, Clone)]
pub struct ExtractionRow {
    pub id: Uuid,
    pub record_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub extraction_method: String,
    pub page_count: usize,
    pub char_count: usize,
    pub pii_detected: bool,
    pub masked_entities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for a new extraction row.
pub struct NewExtraction<'a> {
    pub tenant_id: &'a Uuid,
    pub record_id: &'a Uuid,
    pub filename: &'a str,
    pub mime_type: &'a str,
    pub method: ExtractionMethod,
    pub page_count: usize,
    pub sanitized_text: &'a str,
    pub masked_entities: &'a [String],
}

pub fn insert_extraction(conn: &Connection, new: &NewExtraction<'_>) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO document_extractions
           (id, tenant_id, record_id, filename, mime_type, extraction_method,
            page_count, char_count, sanitized_text, pii_detected, masked_entities, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id.to_string(),
            new.tenant_id.to_string(),
            new.record_id.to_string(),
            new.filename,
            new.mime_type,
            new.method.as_str(),
            new.page_count as i64,
            new.sanitized_text.chars().count() as i64,
            new.sanitized_text,
            !new.masked_entities.is_empty(),
            serde_json::to_string(new.masked_entities)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(id)
}

/// List a record's stored extractions, newest first, tenant-scoped.
pub fn list_for_record(
    conn: &Connection,
    tenant_id: &Uuid,
    record_id: &Uuid,
) -> Result<Vec<ExtractionRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, record_id, filename, mime_type, extraction_method,
                page_count, char_count, pii_detected, masked_entities, created_at
         FROM document_extractions
         WHERE tenant_id = ?1 AND record_id = ?2
         ORDER BY created_at DESC",
    )?;

    #[allow(clippy::type_complexity)]
    let rows = stmt.query_map(
        params![tenant_id.to_string(), record_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, bool>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
            ))
        },
    )?;

    let mut out = Vec::new();
    for row in rows {
        let (id, record_id, filename, mime_type, method, pages, chars, pii, entities, created) =
            row?;
        out.push(ExtractionRow {
            id: Uuid::parse_str(&id).map_err(|_| DatabaseError::InvalidEnum {
                field: "document_extractions.id".into(),
                value: id.clone(),
            })?,
            record_id: Uuid::parse_str(&record_id).map_err(|_| DatabaseError::InvalidEnum {
                field: "document_extractions.record_id".into(),
                value: record_id.clone(),
            })?,
            filename,
            mime_type,
            extraction_method: method,
            page_count: pages as usize,
            char_count: chars as usize,
            pii_detected: pii,
            masked_entities: serde_json::from_str(&entities)?,
            created_at: DateTime::parse_from_rfc3339(&created)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        });
    }
    Ok(out)
}

/// Delete one extraction, tenant-scoped. Returns how many rows went away.
pub fn delete_extraction(
    conn: &Connection,
    tenant_id: &Uuid,
    extraction_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let n = conn.execute(
        "DELETE FROM document_extractions WHERE id = ?1 AND tenant_id = ?2",
        params![extraction_id.to_string(), tenant_id.to_string()],
    )?;
    Ok(n)
}

/// Sanitized text for chat context assembly, tenant-scoped.
pub fn sanitized_texts_for_record(
    conn: &Connection,
    tenant_id: &Uuid,
    record_id: &Uuid,
) -> Result<Vec<(String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT filename, sanitized_text
         FROM document_extractions
         WHERE tenant_id = ?1 AND record_id = ?2
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(
        params![tenant_id.to_string(), record_id.to_string()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
