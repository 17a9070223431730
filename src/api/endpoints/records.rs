//! Context picker endpoints.
//!
//! Listing is tenant-scoped at the query level; the preview endpoint
//! returns the same 404 whether the record is missing or belongs to a
//! different tenant, so record ids cannot be enumerated across tenants.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ContextPreviewResponse, RecordListResponse};
use crate::models::Vertical;
use crate::tenant::TenantRecord;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

fn parse_vertical(raw: &str) -> Result<Vertical, ApiError> {
    Vertical::parse(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown business type: '{raw}'")))
}

/// `GET /api/records/:business_type` — lightweight record list for
/// the authenticated tenant.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Path(business_type): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let vertical = parse_vertical(&business_type)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let records = ctx.fetcher.list_records(vertical, &tenant.id, limit)?;

    Ok(Json(RecordListResponse {
        business_type: vertical.as_str(),
        records,
    }))
}

/// `GET /api/context/:business_type/:record_id` — preview the context
/// block that would be injected for a record.
pub async fn context_preview(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Path((business_type, record_id)): Path<(String, Uuid)>,
) -> Result<Json<ContextPreviewResponse>, ApiError> {
    let vertical = parse_vertical(&business_type)?;

    let block = ctx
        .fetcher
        .fetch_record(vertical, &record_id, &tenant.id)?
        .ok_or_else(|| ApiError::NotFound("Record not found".into()))?;

    let formatted = block.format_for_prompt();
    let fields = block
        .lines
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
        .collect();

    Ok(Json(ContextPreviewResponse {
        record_id: block.record_id,
        label: block.label,
        fields,
        formatted,
    }))
}
