//! Chat orchestration.
//!
//! One request runs the full privacy pipeline: sanitize the query,
//! fetch tenant-scoped context, assemble the layered prompt, stream the
//! model reply (rehydrating PII tokens per chunk for the client while
//! keeping only masked text for the audit trail), then wipe the token
//! map. Events flow to the caller over a channel-backed stream, so a
//! dropped client never interrupts auditing or cleanup.

pub mod model;

pub use model::{ChatModel, MockChatModel, ModelChunk, ModelError, OllamaChatModel};

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::audit::{AuditLogger, Interaction};
use crate::context::ContextFetcher;
use crate::models::{Tone, UsageCounters, Vertical};
use crate::prompt::PromptAssembler;
use crate::sanitizer::{PiiSanitizer, SessionMap};
use crate::tenant::TenantRecord;

/// Chat request body. The tenant identity always comes from the
/// authenticated header; a `tenant_id` in the body is accepted for
/// compatibility and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(rename = "business_type")]
    pub vertical: Vertical,
    #[serde(default)]
    pub record_id: Option<Uuid>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Events emitted over the SSE stream, tagged by `type`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ShieldActive {
        has_pii: bool,
        masked_entities: Vec<String>,
        sanitized_prompt: String,
    },
    Status {
        message: String,
    },
    Chunk {
        content: String,
    },
    Done {
        session_id: String,
        usage: UsageCounters,
    },
    Error {
        message: String,
    },
}

/// Pipeline stage names, used as the error type in audit entries.
#[derive(Debug, Clone, Copy)]
enum Stage {
    FetchingContext,
    Streaming,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchingContext => "CONTEXT_FETCH",
            Stage::Streaming => "MODEL_STREAM",
        }
    }
}

struct Parts {
    fetcher: Arc<ContextFetcher>,
    prompts: Arc<PromptAssembler>,
    model: Arc<dyn ChatModel>,
    audit: Arc<AuditLogger>,
}

pub struct ChatOrchestrator {
    fetcher: Arc<ContextFetcher>,
    prompts: Arc<PromptAssembler>,
    model: Arc<dyn ChatModel>,
    audit: Arc<AuditLogger>,
}

impl ChatOrchestrator {
    pub fn new(
        fetcher: Arc<ContextFetcher>,
        prompts: Arc<PromptAssembler>,
        model: Arc<dyn ChatModel>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            fetcher,
            prompts,
            model,
            audit,
        }
    }

    /// Run the pipeline for one request. The returned stream yields
    /// events until `done` or `error`; the pipeline itself runs in a
    /// spawned task and completes its audit/cleanup duties even if the
    /// consumer drops the stream early.
    pub fn run(
        &self,
        tenant: TenantRecord,
        request: ChatRequest,
    ) -> impl Stream<Item = ChatEvent> + Send {
        let parts = Parts {
            fetcher: self.fetcher.clone(),
            prompts: self.prompts.clone(),
            model: self.model.clone(),
            audit: self.audit.clone(),
        };
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(run_pipeline(parts, tenant, request, tx));

        futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}

async fn emit(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    tx.send(event).await.is_ok()
}

async fn run_pipeline(
    parts: Parts,
    tenant: TenantRecord,
    request: ChatRequest,
    tx: mpsc::Sender<ChatEvent>,
) {
    let session_id = request
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut sanitizer = PiiSanitizer::new();
    let (sanitized_query, session_map) = sanitizer.sanitize(&request.query);
    let has_pii = !session_map.is_empty();

    let mut masked_entities: Vec<String> = session_map.keys().cloned().collect();
    masked_entities.sort();

    emit(
        &tx,
        ChatEvent::ShieldActive {
            has_pii,
            masked_entities,
            sanitized_prompt: sanitized_query.clone(),
        },
    )
    .await;

    let outcome = stream_reply(
        &parts,
        &tenant,
        &request,
        &sanitizer,
        &session_map,
        &sanitized_query,
        &tx,
    )
    .await;

    match outcome {
        Ok((sanitized_response, usage)) => {
            emit(
                &tx,
                ChatEvent::Done {
                    session_id: session_id.clone(),
                    usage,
                },
            )
            .await;

            parts.audit.log_interaction(&Interaction {
                session_id: &session_id,
                tenant_id: &tenant.id,
                vertical: request.vertical,
                model: parts.model.model_name(),
                record_id: request.record_id.as_ref(),
                pii_masked: has_pii,
                sanitized_query: &sanitized_query,
                sanitized_response: &sanitized_response,
            });
        }
        Err((stage, detail)) => {
            tracing::warn!(stage = stage.as_str(), detail, "chat pipeline failed");
            parts.audit.log_error(&session_id, stage.as_str(), &detail);
            emit(
                &tx,
                ChatEvent::Error {
                    message: format!("Processing error: {}", stage.as_str()),
                },
            )
            .await;
        }
    }

    // The token map must not outlive the request.
    sanitizer.clear_session(&session_map);
}

async fn stream_reply(
    parts: &Parts,
    tenant: &TenantRecord,
    request: &ChatRequest,
    sanitizer: &PiiSanitizer,
    session_map: &SessionMap,
    sanitized_query: &str,
    tx: &mpsc::Sender<ChatEvent>,
) -> Result<(String, UsageCounters), (Stage, String)> {
    emit(
        tx,
        ChatEvent::Status {
            message: "Loading record context…".into(),
        },
    )
    .await;

    let mut record_context = None;
    let mut documents = Vec::new();
    if let Some(record_id) = &request.record_id {
        record_context = parts
            .fetcher
            .fetch_record(request.vertical, record_id, &tenant.id)
            .map_err(|e| (Stage::FetchingContext, e.to_string()))?;
        documents = parts
            .fetcher
            .fetch_documents(record_id, &tenant.id)
            .map_err(|e| (Stage::FetchingContext, e.to_string()))?;
    }

    let tone = request.tone.unwrap_or(tenant.tone);
    let system_instruction =
        parts
            .prompts
            .build_system_instruction(request.vertical, tenant, tone);
    let user_turn = parts
        .prompts
        .build_user_turn(record_context.as_ref(), &documents, sanitized_query);

    emit(
        tx,
        ChatEvent::Status {
            message: "Thinking…".into(),
        },
    )
    .await;

    let mut stream = parts
        .model
        .stream_chat(&system_instruction, &user_turn)
        .await
        .map_err(|e| (Stage::Streaming, e.to_string()))?;

    let mut sanitized_response = String::new();
    let mut usage = UsageCounters::default();

    while let Some(item) = stream.next().await {
        let chunk = item.map_err(|e| (Stage::Streaming, e.to_string()))?;
        if chunk.done {
            if let Some(u) = chunk.usage {
                usage = u;
            }
            break;
        }
        if chunk.text.is_empty() {
            continue;
        }

        // The masked form is what we keep; the client gets real values back.
        sanitized_response.push_str(&chunk.text);
        let rehydrated = sanitizer.rehydrate(&chunk.text, session_map);
        if !emit(tx, ChatEvent::Chunk { content: rehydrated }).await {
            // Client went away. Stop forwarding; audit still happens.
            break;
        }
    }

    Ok((sanitized_response, usage))
}
