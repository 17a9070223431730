//! Tenant row access. The tenants table is the gateway's credential
//! directory: a row's existence is what authenticates a tenant id.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Tone, Vertical};
use crate::tenant::TenantRecord;

struct RawTenantRow {
    id: String,
    business_name: String,
    vertical: String,
    tone: String,
    core_entities: String,
    custom_policy: String,
    created_at: String,
    updated_at: String,
}

fn from_raw(raw: RawTenantRow) -> Result<TenantRecord, DatabaseError> {
    let id = Uuid::parse_str(&raw.id).map_err(|_| DatabaseError::InvalidEnum {
        field: "tenants.id".into(),
        value: raw.id.clone(),
    })?;
    let vertical = Vertical::parse(&raw.vertical).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "tenants.vertical".into(),
        value: raw.vertical.clone(),
    })?;
    let tone = Tone::parse(&raw.tone).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "tenants.tone".into(),
        value: raw.tone.clone(),
    })?;
    let core_entities: Vec<String> = serde_json::from_str(&raw.core_entities)?;
    Ok(TenantRecord {
        id,
        business_name: raw.business_name,
        vertical,
        tone,
        core_entities,
        custom_policy: raw.custom_policy,
        created_at: parse_timestamp(&raw.created_at),
        updated_at: parse_timestamp(&raw.updated_at),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const SELECT_COLUMNS: &str =
    "id, business_name, vertical, tone, core_entities, custom_policy, created_at, updated_at";

/// Look up a tenant by id. `Ok(None)` means the id is unknown.
pub fn get_tenant(conn: &Connection, id: &Uuid) -> Result<Option<TenantRecord>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM tenants WHERE id = ?1"),
            params![id.to_string()],
            |row| {
                Ok(RawTenantRow {
                    id: row.get(0)?,
                    business_name: row.get(1)?,
                    vertical: row.get(2)?,
                    tone: row.get(3)?,
                    core_entities: row.get(4)?,
                    custom_policy: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()?;

    raw.map(from_raw).transpose()
}

/// Insert a new tenant and return the stored record.
pub fn insert_tenant(
    conn: &Connection,
    id: &Uuid,
    business_name: &str,
    vertical: Vertical,
    tone: Tone,
    core_entities: &[String],
    custom_policy: &str,
) -> Result<TenantRecord, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO tenants (id, business_name, vertical, tone, core_entities, custom_policy, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            business_name,
            vertical.as_str(),
            tone.as_str(),
            serde_json::to_string(core_entities)?,
            custom_policy,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;
    get_tenant(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "tenant".into(),
        id: id.to_string(),
    })
}

/// Overwrite an existing tenant's configuration. Returns the fresh row,
/// or `NotFound` if the id does not exist.
pub fn update_tenant(
    conn: &Connection,
    id: &Uuid,
    business_name: &str,
    vertical: Vertical,
    tone: Tone,
    core_entities: &[String],
    custom_policy: &str,
) -> Result<TenantRecord, DatabaseError> {
    let changed = conn.execute(
        "UPDATE tenants
         SET business_name = ?2, vertical = ?3, tone = ?4, core_entities = ?5,
             custom_policy = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            id.to_string(),
            business_name,
            vertical.as_str(),
            tone.as_str(),
            serde_json::to_string(core_entities)?,
            custom_policy,
            Utc::now().to_rfc3339(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "tenant".into(),
            id: id.to_string(),
        });
    }
    get_tenant(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "tenant".into(),
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn seed(conn: &Connection) -> TenantRecord {
        insert_tenant(
            conn,
            &Uuid::new_v4(),
            "Byte Clinic",
            Vertical::ItLab,
            Tone::Technical,
            &["ticket".to_string(), "device".to_string()],
            "Never promise same-day repairs.",
        )
        .unwrap()
    }

    #[test]
    fn insert_then_get_round_trips() {
        let conn = open_memory_database().unwrap();
        let tenant = seed(&conn);

        let found = get_tenant(&conn, &tenant.id).unwrap().unwrap();
        assert_eq!(found.business_name, "Byte Clinic");
        assert_eq!(found.vertical, Vertical::ItLab);
        assert_eq!(found.tone, Tone::Technical);
        assert_eq!(found.core_entities, vec!["ticket", "device"]);
        assert_eq!(found.custom_policy, "Never promise same-day repairs.");
    }

    #[test]
    fn unknown_id_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_tenant(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn update_overwrites_config() {
        let conn = open_memory_database().unwrap();
        let tenant = seed(&conn);

        let updated = update_tenant(
            &conn,
            &tenant.id,
            "Byte Clinic 2.0",
            Vertical::ItLab,
            Tone::Friendly,
            &[],
            "",
        )
        .unwrap();
        assert_eq!(updated.business_name, "Byte Clinic 2.0");
        assert_eq!(updated.tone, Tone::Friendly);
        assert!(updated.core_entities.is_empty());
    }

    #[test]
    fn update_missing_tenant_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_tenant(
            &conn,
            &Uuid::new_v4(),
            "Ghost",
            Vertical::Cafe,
            Tone::Casual,
            &[],
            "",
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
