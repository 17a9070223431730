//! Tokenized audit trail.
//!
//! One JSONL entry per event, appended to a per-day file. Callers pass
//! already-sanitized text; nothing here masks anything, and nothing raw
//! may ever reach this module. Write failures are logged and swallowed,
//! an audit hiccup must not fail the request it describes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::models::Vertical;

/// Truncation limit for query/response previews in log entries.
const LOG_PREVIEW_MAX: usize = 300;

pub struct Interaction<'a> {
    pub session_id: &'a str,
    pub tenant_id: &'a Uuid,
    pub vertical: Vertical,
    pub model: &'a str,
    pub record_id: Option<&'a Uuid>,
    pub pii_masked: bool,
    pub sanitized_query: &'a str,
    pub sanitized_response: &'a str,
}

pub struct AuditLogger {
    log_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(log_dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            tracing::error!(dir = %log_dir.display(), error = %e, "cannot create audit log dir");
        }
        Self {
            log_dir: log_dir.to_path_buf(),
        }
    }

    /// Persist one chat interaction. Query and response must already be
    /// masked by the sanitizer.
    pub fn log_interaction(&self, interaction: &Interaction<'_>) {
        self.write(&json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "CHAT_INTERACTION",
            "session_id": interaction.session_id,
            "tenant_id": interaction.tenant_id.to_string(),
            "business_type": interaction.vertical.as_str(),
            "model": interaction.model,
            "record_id": interaction.record_id.map(Uuid::to_string),
            "pii_detected_masked": interaction.pii_masked,
            "sanitized_query": preview(interaction.sanitized_query),
            "sanitized_response": preview(interaction.sanitized_response),
            "query_len": interaction.sanitized_query.chars().count(),
            "response_len": interaction.sanitized_response.chars().count(),
        }));
    }

    /// Log a processing error. Never include user data in the message.
    pub fn log_error(&self, session_id: &str, error_type: &str, message: &str) {
        self.write(&json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "ERROR",
            "session_id": session_id,
            "error_type": error_type,
            "message": message,
        }));
    }

    /// Log onboarding configuration changes (no sensitive data).
    pub fn log_onboarding(&self, tenant_id: &Uuid, vertical: Vertical, action: &str) {
        self.write(&json!({
            "ts": Utc::now().to_rfc3339(),
            "event": format!("ONBOARDING_{action}"),
            "tenant_id": tenant_id.to_string(),
            "business_type": vertical.as_str(),
        }));
    }

    /// Log a document upload outcome (metadata only).
    pub fn log_document(
        &self,
        tenant_id: &Uuid,
        record_id: &Uuid,
        method: &str,
        pii_masked: bool,
        stored: bool,
    ) {
        self.write(&json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "DOCUMENT_EXTRACTED",
            "tenant_id": tenant_id.to_string(),
            "record_id": record_id.to_string(),
            "extraction_method": method,
            "pii_detected_masked": pii_masked,
            "stored": stored,
        }));
    }

    /// Today's log file path (rotates at midnight UTC).
    fn log_file(&self) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d");
        self.log_dir.join(format!("cortex_audit_{today}.jsonl"))
    }

    fn write(&self, entry: &serde_json::Value) {
        let path = self.log_file();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{entry}"));

        if let Err(e) = result {
            tracing::error!(path = %path.display(), error = %e, "audit write failed");
        }
    }
}

/// Char-safe preview truncation.
fn preview(text: &str) -> String {
    if text.chars().count() <= LOG_PREVIEW_MAX {
        return text.to_string();
    }
    let mut out: String = text.chars().take(LOG_PREVIEW_MAX).collect();
    out.push('\u{2026}');
    out
}
