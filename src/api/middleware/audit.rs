//! Access logging middleware.
//!
//! Runs innermost, after auth has injected the tenant, so every log
//! line can carry the tenant id. Paths and statuses only; request and
//! response bodies never appear here.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::tenant::TenantRecord;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let tenant_id = req
        .extensions()
        .get::<TenantRecord>()
        .map(|t| t.id.to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    match tenant_id {
        Some(tenant_id) => {
            tracing::info!(%method, %path, status, %tenant_id, "api access");
        }
        None => {
            tracing::info!(%method, %path, status, "api access");
        }
    }

    response
}
