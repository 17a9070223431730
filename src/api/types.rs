//! Shared types for the HTTP API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::chat::ChatOrchestrator;
use crate::context::ContextFetcher;
use crate::db::Storage;
use crate::extraction::DocumentExtractor;
use crate::models::{Tone, Vertical};
use crate::tenant::{TenantGuard, TenantRecord};
use crate::worker::WorkerPool;

/// Shared context for all API routes and middleware.
///
/// Middleware reads it from request extensions; handlers get it via
/// `State`. Everything inside is cheaply cloneable.
#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub guard: Arc<TenantGuard>,
    pub fetcher: Arc<ContextFetcher>,
    pub extractor: Arc<DocumentExtractor>,
    pub workers: WorkerPool,
    pub audit: Arc<AuditLogger>,
    pub chat: Arc<ChatOrchestrator>,
}

impl ApiContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Storage,
        guard: Arc<TenantGuard>,
        fetcher: Arc<ContextFetcher>,
        extractor: Arc<DocumentExtractor>,
        workers: WorkerPool,
        audit: Arc<AuditLogger>,
        chat: Arc<ChatOrchestrator>,
    ) -> Self {
        Self {
            storage,
            guard,
            fetcher,
            extractor,
            workers,
            audit,
            chat,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Onboarding
// ═══════════════════════════════════════════════════════════

/// Body of `POST /api/onboarding`. When `tenant_id` is present the
/// existing configuration is overwritten, otherwise a new tenant row
/// is created.
#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub business_name: String,
    #[serde(rename = "business_type")]
    pub vertical: Vertical,
    #[serde(rename = "tone_of_voice", default)]
    pub tone: Tone,
    #[serde(default)]
    pub core_entities: Vec<String>,
    #[serde(rename = "custom_instructions", default)]
    pub custom_policy: String,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub success: bool,
    pub tenant_id: Uuid,
    pub message: &'static str,
}

/// Tenant configuration as returned by `GET /api/onboarding/:id`.
#[derive(Debug, Serialize)]
pub struct TenantConfigResponse {
    pub tenant_id: Uuid,
    pub business_name: String,
    pub business_type: &'static str,
    pub tone_of_voice: &'static str,
    pub core_entities: Vec<String>,
    pub custom_instructions: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TenantRecord> for TenantConfigResponse {
    fn from(tenant: TenantRecord) -> Self {
        Self {
            tenant_id: tenant.id,
            business_name: tenant.business_name,
            business_type: tenant.vertical.as_str(),
            tone_of_voice: tenant.tone.as_str(),
            core_entities: tenant.core_entities,
            custom_instructions: tenant.custom_policy,
            created_at: tenant.created_at.to_rfc3339(),
            updated_at: tenant.updated_at.to_rfc3339(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Context picker
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub business_type: &'static str,
    pub records: Vec<crate::context::RecordSummary>,
}

/// Preview of the context block the chat pipeline would inject for a
/// record, so the UI can show what the model will see.
#[derive(Debug, Serialize)]
pub struct ContextPreviewResponse {
    pub record_id: Uuid,
    pub label: String,
    pub fields: Map<String, serde_json::Value>,
    pub formatted: String,
}

// ═══════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════

/// Extraction metadata returned after a successful upload. The full
/// sanitized text is persisted server-side; the client only gets a
/// preview, unless persistence failed and the text would otherwise
/// be lost.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub extraction_method: &'static str,
    pub page_count: usize,
    pub char_count: usize,
    pub pii_detected: bool,
    pub masked_entities: Vec<String>,
    pub sanitized_preview: String,
    pub sanitized_text: Option<String>,
    pub record_id: Uuid,
    pub tenant_id: Uuid,
    pub storage_ok: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub extraction_method: String,
    pub page_count: usize,
    pub char_count: usize,
    pub pii_detected: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_request_accepts_wire_names() {
        let req: OnboardingRequest = serde_json::from_str(
            r#"{
                "business_name": "Beit Cafe",
                "business_type": "CAFE",
                "tone_of_voice": "friendly",
                "core_entities": ["menu", "orders"],
                "custom_instructions": "Always mention the daily special."
            }"#,
        )
        .unwrap();

        assert_eq!(req.business_name, "Beit Cafe");
        assert_eq!(req.vertical, Vertical::Cafe);
        assert_eq!(req.tone, Tone::Friendly);
        assert_eq!(req.core_entities, vec!["menu", "orders"]);
        assert!(req.tenant_id.is_none());
    }

    #[test]
    fn onboarding_request_defaults() {
        let req: OnboardingRequest = serde_json::from_str(
            r#"{"business_name": "Lex & Co", "business_type": "LAW_FIRM"}"#,
        )
        .unwrap();

        assert_eq!(req.tone, Tone::Professional);
        assert!(req.core_entities.is_empty());
        assert!(req.custom_policy.is_empty());
    }

    #[test]
    fn upload_response_serializes_null_text_when_stored() {
        let resp = UploadResponse {
            document_id: Uuid::new_v4(),
            filename: "invoice.pdf".into(),
            mime_type: "application/pdf".into(),
            extraction_method: "native",
            page_count: 2,
            char_count: 1234,
            pii_detected: true,
            masked_entities: vec!["[EMAIL_1]".into()],
            sanitized_preview: "Acme Corp".into(),
            sanitized_text: None,
            record_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            storage_ok: true,
        };

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["sanitized_text"].is_null());
        assert_eq!(json["storage_ok"], true);
        assert_eq!(json["extraction_method"], "native");
    }
}
