//! Document ingestion endpoints.
//!
//! The raw upload bytes never leave the process: extraction and
//! sanitization happen here, and only PII-masked text is persisted.
//! Extraction is CPU-heavy, so it runs on the worker pool instead of
//! blocking the async runtime.

use axum::extract::{Multipart, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, DeleteResponse, DocumentListResponse, DocumentSummary, UploadResponse,
};
use crate::config::MAX_UPLOAD_BYTES;
use crate::db::repository::extraction as extraction_repo;
use crate::db::repository::extraction::NewExtraction;
use crate::extraction::{is_supported_mime, ExtractionResult};
use crate::sanitizer::PiiSanitizer;
use crate::tenant::TenantRecord;

/// Characters of sanitized text returned inline with the upload
/// response. The full text stays server-side.
const PREVIEW_CHARS: usize = 800;

const ACCEPTED_TYPES: &str = "application/pdf, image/jpeg, image/png, image/tiff, image/webp";

struct UploadFields {
    filename: String,
    mime_type: String,
    data: Vec<u8>,
    record_id: Uuid,
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut record_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("<unknown>").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_lowercase();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read file: {e}")))?;
                file = Some((filename, mime_type, data.to_vec()));
            }
            Some("record_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Malformed record_id: {e}")))?;
                let id = Uuid::parse_str(raw.trim()).map_err(|_| {
                    ApiError::BadRequest(format!("record_id is not a valid UUID: '{raw}'"))
                })?;
                record_id = Some(id);
            }
            _ => {}
        }
    }

    let (filename, mime_type, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".into()))?;
    let record_id =
        record_id.ok_or_else(|| ApiError::BadRequest("Missing 'record_id' field".into()))?;

    Ok(UploadFields {
        filename,
        mime_type,
        data,
        record_id,
    })
}

/// `POST /api/documents/upload` — extract, sanitize, and persist one
/// document against the active record.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let fields = read_multipart(multipart).await?;

    let normalized_mime = fields
        .mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    if !is_supported_mime(&normalized_mime) {
        return Err(ApiError::UnsupportedMedia(format!(
            "Unsupported file type: '{normalized_mime}'. Accepted: {ACCEPTED_TYPES}"
        )));
    }

    let file_size = fields.data.len();
    if file_size == 0 {
        return Err(ApiError::BadRequest("Uploaded file is empty (0 bytes)".into()));
    }
    if file_size > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "File size {:.1} MB exceeds the 20 MB limit. \
             Extract a smaller subset or split the file.",
            file_size as f64 / 1_048_576.0
        )));
    }

    tracing::info!(
        tenant_id = %tenant.id,
        record_id = %fields.record_id,
        filename = %fields.filename,
        size = file_size,
        mime = %normalized_mime,
        "document upload"
    );

    let result: ExtractionResult = {
        let extractor = ctx.extractor.clone();
        let data = fields.data;
        let mime = normalized_mime.clone();
        ctx.workers
            .submit(move || extractor.extract(&data, &mime))
            .await??
    };

    if result.text.is_empty() {
        return Err(ApiError::Unprocessable(
            "No text could be extracted from the document. \
             The file may be an image-only scan without recognisable text, \
             or the content may be in a script the OCR engine cannot decode."
                .into(),
        ));
    }

    let mut sanitizer = PiiSanitizer::new();
    let (sanitized_text, session) = sanitizer.sanitize(&result.text);
    let pii_detected = !session.is_empty();
    let mut masked_entities: Vec<String> = session.keys().cloned().collect();
    masked_entities.sort();

    tracing::info!(
        method = result.method.as_str(),
        pages = result.page_count,
        chars = sanitized_text.chars().count(),
        pii = pii_detected,
        "document parsed"
    );

    // Persistence is non-fatal: if the insert fails the extracted text
    // is still returned to the client so the work is not lost.
    let mut store_failed = false;
    let document_id = {
        let insert = ctx.storage.conn().and_then(|conn| {
            extraction_repo::insert_extraction(
                &conn,
                &NewExtraction {
                    tenant_id: &tenant.id,
                    record_id: &fields.record_id,
                    filename: &fields.filename,
                    mime_type: &normalized_mime,
                    method: result.method,
                    page_count: result.page_count,
                    sanitized_text: &sanitized_text,
                    masked_entities: &masked_entities,
                },
            )
        });
        match insert {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "document_extractions insert failed");
                store_failed = true;
                Uuid::new_v4()
            }
        }
    };

    // Wipe session tokens from memory regardless of the store outcome.
    sanitizer.clear_session(&session);

    ctx.audit.log_document(
        &tenant.id,
        &fields.record_id,
        result.method.as_str(),
        pii_detected,
        !store_failed,
    );

    let sanitized_preview: String = sanitized_text.chars().take(PREVIEW_CHARS).collect();

    Ok(Json(UploadResponse {
        document_id,
        filename: fields.filename,
        mime_type: normalized_mime,
        extraction_method: result.method.as_str(),
        page_count: result.page_count,
        char_count: sanitized_text.chars().count(),
        pii_detected,
        masked_entities,
        sanitized_preview,
        sanitized_text: if store_failed {
            Some(sanitized_text)
        } else {
            None
        },
        record_id: fields.record_id,
        tenant_id: tenant.id,
        storage_ok: !store_failed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub record_id: Uuid,
}

/// `GET /api/documents/list?record_id=…` — stored extractions for a
/// record, newest first. The full sanitized text is omitted; the chat
/// pipeline reads it server-side.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let rows = {
        let conn = ctx.storage.conn()?;
        extraction_repo::list_for_record(&conn, &tenant.id, &query.record_id)?
    };

    let documents = rows
        .into_iter()
        .map(|row| DocumentSummary {
            id: row.id,
            filename: row.filename,
            mime_type: row.mime_type,
            extraction_method: row.extraction_method,
            page_count: row.page_count,
            char_count: row.char_count,
            pii_detected: row.pii_detected,
            created_at: row.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(DocumentListResponse { documents }))
}

/// `DELETE /api/documents/:document_id` — remove one extraction row.
///
/// The delete is tenant-scoped, so a foreign document id and a
/// nonexistent one produce the same 404.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = {
        let conn = ctx.storage.conn()?;
        extraction_repo::delete_extraction(&conn, &tenant.id, &document_id)?
    };

    if deleted == 0 {
        return Err(ApiError::NotFound("Document not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: document_id,
    }))
}
