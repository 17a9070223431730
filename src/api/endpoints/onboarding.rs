//! Tenant onboarding endpoints.
//!
//! Saving the configuration is deliberately public: it is what creates
//! the tenant row in the first place. The returned tenant id must be
//! stored by the client and sent in `X-Cortex-Tenant-ID` from then on.
//! Reading the configuration back requires auth, and a tenant may only
//! read their own.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, OnboardingRequest, OnboardingResponse, TenantConfigResponse};
use crate::db::repository::tenant as tenant_repo;
use crate::db::DatabaseError;
use crate::tenant::TenantRecord;

/// `POST /api/onboarding` — create or overwrite a tenant configuration.
pub async fn save(
    State(ctx): State<ApiContext>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    if req.business_name.trim().is_empty() {
        return Err(ApiError::BadRequest("business_name must not be empty".into()));
    }

    let stored = {
        let conn = ctx.storage.conn()?;
        match req.tenant_id {
            Some(id) => tenant_repo::update_tenant(
                &conn,
                &id,
                req.business_name.trim(),
                req.vertical,
                req.tone,
                &req.core_entities,
                &req.custom_policy,
            ),
            None => tenant_repo::insert_tenant(
                &conn,
                &Uuid::new_v4(),
                req.business_name.trim(),
                req.vertical,
                req.tone,
                &req.core_entities,
                &req.custom_policy,
            ),
        }
    };

    let tenant = match stored {
        Ok(tenant) => tenant,
        Err(DatabaseError::NotFound { .. }) => {
            return Err(ApiError::NotFound("Configuration not found".into()));
        }
        Err(e) => return Err(e.into()),
    };

    // Bust the guard cache so the next request sees the fresh config.
    ctx.guard.invalidate(&tenant.id);
    ctx.audit.log_onboarding(&tenant.id, tenant.vertical, "SAVED");

    Ok(Json(OnboardingResponse {
        success: true,
        tenant_id: tenant.id,
        message: "Business configuration saved successfully",
    }))
}

/// `GET /api/onboarding/:tenant_id` — read the tenant's own config.
///
/// The guard has already validated the header; the path param must
/// match the authenticated tenant. The row is re-read from the
/// database so a just-saved update is never served stale.
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(tenant): Extension<TenantRecord>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<TenantConfigResponse>, ApiError> {
    if tenant.id != tenant_id {
        return Err(ApiError::Forbidden);
    }

    let fresh = {
        let conn = ctx.storage.conn()?;
        tenant_repo::get_tenant(&conn, &tenant_id)?
    };

    match fresh {
        Some(record) => Ok(Json(record.into())),
        None => Err(ApiError::NotFound("Configuration not found".into())),
    }
}
