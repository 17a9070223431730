//! Tenant authentication middleware.
//!
//! Extracts `X-Cortex-Tenant-ID`, validates it through the tenant
//! guard, and injects the resolved `TenantRecord` into request
//! extensions for downstream handlers. Every rejection is identical
//! on the wire.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Header carrying the tenant identity on every protected request.
pub const TENANT_HEADER: &str = "x-cortex-tenant-id";

/// Require a valid tenant header.
///
/// Accesses `ApiContext` from request extensions (injected by the
/// Extension layer).
pub async fn require_tenant(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_tenant_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_tenant_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let header = req
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok());

    let tenant = ctx.guard.authenticate(header)?;

    req.extensions_mut().insert(tenant);

    Ok(next.run(req).await)
}
