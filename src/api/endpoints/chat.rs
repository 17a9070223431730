//! Chat streaming endpoint.
//!
//! The tenant identity comes exclusively from the authenticated
//! header; any `tenant_id` in the body is ignored by the orchestrator.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use futures_util::{Stream, StreamExt};

use crate::api::types::ApiContext;
use crate::chat::ChatRequest;
use crate::tenant::TenantRecord;

/// `POST /api/chat/stream` — run the privacy pipeline and stream the
/// reply as server-sent events.
pub async fn stream(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = ctx.chat.run(tenant, request);

    let stream = events.map(|event| Event::default().json_data(&event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
