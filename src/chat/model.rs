//! Model backend abstraction.
//!
//! The orchestrator only needs "send system + user text, get a stream of
//! chunks back". `OllamaChatModel` speaks the Ollama-compatible
//! `/api/generate` NDJSON protocol; tests use `MockChatModel`.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::UsageCounters;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cannot reach model backend: {0}")]
    Connection(String),

    #[error("model backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Parse(String),
}

/// One unit of streamed model output.
#[derive(Debug, Clone)]
pub struct ModelChunk {
    pub text: String,
    pub done: bool,
    /// Present only on the final chunk, when the backend reports it.
    pub usage: Option<UsageCounters>,
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, ModelError>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable model identifier, for audit entries.
    fn model_name(&self) -> &str;

    async fn stream_chat(&self, system: &str, user: &str) -> Result<ModelStream, ModelError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

/// Streaming client for an Ollama-compatible backend.
pub struct OllamaChatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChatModel {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, system: &str, user: &str) -> Result<ModelStream, ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                system,
                prompt: user,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        // NDJSON lines can straddle network chunks; a forwarding task
        // reassembles them and feeds parsed chunks into a channel.
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<ModelChunk, ModelError>>(32);
        tokio::spawn(forward_ndjson(response, tx));

        Ok(Box::pin(futures_util::stream::unfold(rx, |mut rx| async {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

async fn forward_ndjson(
    response: reqwest::Response,
    tx: tokio::sync::mpsc::Sender<Result<ModelChunk, ModelError>>,
) {
    let mut bytes = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(part) = bytes.next().await {
        let part = match part {
            Ok(part) => part,
            Err(e) => {
                let _ = tx.send(Err(ModelError::Connection(e.to_string()))).await;
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&part));

        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(chunk) => {
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver gone, stop reading
                    }
                    if done {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Result<ModelChunk, ModelError> {
    let parsed: GenerateChunk =
        serde_json::from_str(line).map_err(|e| ModelError::Parse(e.to_string()))?;
    let usage = if parsed.done {
        Some(UsageCounters {
            prompt_tokens: parsed.prompt_eval_count.unwrap_or(0),
            completion_tokens: parsed.eval_count.unwrap_or(0),
        })
    } else {
        None
    };
    Ok(ModelChunk {
        text: parsed.response,
        done: parsed.done,
        usage,
    })
}

/// Scripted model for tests: yields the configured chunks, then a final
/// done chunk carrying usage counters.
pub struct MockChatModel {
    chunks: Vec<String>,
    usage: UsageCounters,
    fail: bool,
}

impl MockChatModel {
    pub fn scripted(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|s| s.to_string()).collect(),
            usage: UsageCounters {
                prompt_tokens: 10,
                completion_tokens: 20,
            },
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            chunks: vec![],
            usage: UsageCounters::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn stream_chat(&self, _system: &str, _user: &str) -> Result<ModelStream, ModelError> {
        if self.fail {
            return Err(ModelError::Connection("scripted failure".into()));
        }
        let mut items: Vec<Result<ModelChunk, ModelError>> = self
            .chunks
            .iter()
            .map(|text| {
                Ok(ModelChunk {
                    text: text.clone(),
                    done: false,
                    usage: None,
                })
            })
            .collect();
        items.push(Ok(ModelChunk {
            text: String::new(),
            done: true,
            usage: Some(self.usage),
        }));
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}
