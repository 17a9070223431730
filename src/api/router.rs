//! Gateway HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. Tenant-scoped routes are nested under `/api/` behind the
//! auth guard; onboarding save is public because it is what creates
//! the tenant row. `/health` sits at the root for load balancers.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;

/// Slack on top of the upload ceiling for multipart framing, so the
/// handler's own 413 (with a useful message) fires before axum's.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Build the gateway router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost
/// layer). Endpoint handlers use `State<ApiContext>` (provided via
/// `with_state`).
pub fn gateway_router(ctx: ApiContext, allowed_origins: &[String]) -> Router {
    // Protected routes — auth guard + access log
    //
    // Layers run outermost last: Extension → Auth → Audit → Handler.
    let protected = Router::new()
        .route("/onboarding/:tenant_id", get(endpoints::onboarding::get))
        .route("/records/:business_type", get(endpoints::records::list))
        .route(
            "/context/:business_type/:record_id",
            get(endpoints::records::context_preview),
        )
        .route("/documents/upload", post(endpoints::documents::upload))
        .route("/documents/list", get(endpoints::documents::list))
        .route(
            "/documents/:document_id",
            delete(endpoints::documents::delete),
        )
        .route("/chat/stream", post(endpoints::chat::stream))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_tenant))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes — onboarding creates the tenant, so there is
    // no tenant header to validate yet
    let unprotected = Router::new()
        .route("/onboarding", post(endpoints::onboarding::save))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .route("/health", get(endpoints::health::check))
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + BODY_LIMIT_SLACK))
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::audit::AuditLogger;
    use crate::chat::{ChatOrchestrator, MockChatModel};
    use crate::context::ContextFetcher;
    use crate::db::repository::{record as record_repo, tenant as tenant_repo};
    use crate::db::Storage;
    use crate::extraction::ocr::MockOcrEngine;
    use crate::extraction::pdf::PdfExtractTextLayer;
    use crate::extraction::pdfium::MockPdfPageRenderer;
    use crate::extraction::test_pdfs::make_test_pdf;
    use crate::extraction::DocumentExtractor;
    use crate::models::{Tone, Vertical};
    use crate::prompt::PromptAssembler;
    use crate::tenant::TenantGuard;
    use crate::worker::WorkerPool;

    struct Fixture {
        storage: Storage,
        tenant_id: Uuid,
        record_id: Uuid,
        _audit_dir: tempfile::TempDir,
    }

    fn build(model_chunks: &[&str]) -> (Router, Fixture) {
        let storage = Storage::open_in_memory().unwrap();
        let audit_dir = tempfile::tempdir().unwrap();

        let (tenant_id, record_id) = {
            let conn = storage.conn().unwrap();
            let tenant = tenant_repo::insert_tenant(
                &conn,
                &Uuid::new_v4(),
                "Byte Clinic",
                Vertical::ItLab,
                Tone::Technical,
                &["repairs".to_string()],
                "",
            )
            .unwrap();
            let mut fields = serde_json::Map::new();
            fields.insert("device".into(), serde_json::Value::String("ThinkPad T14".into()));
            let record_id = record_repo::insert_record(
                &conn,
                &tenant.id,
                Vertical::ItLab,
                "Ticket 9",
                &fields,
            )
            .unwrap();
            (tenant.id, record_id)
        };

        let guard = Arc::new(TenantGuard::new(storage.clone()));
        let fetcher = Arc::new(ContextFetcher::new(storage.clone()));
        let extractor = Arc::new(DocumentExtractor::new(
            Box::new(PdfExtractTextLayer),
            Box::new(MockPdfPageRenderer::new(1)),
            Box::new(MockOcrEngine::returning("scanned page text")),
        ));
        let workers = WorkerPool::new(2);
        let audit = Arc::new(AuditLogger::new(audit_dir.path()));
        let chat = Arc::new(ChatOrchestrator::new(
            fetcher.clone(),
            Arc::new(PromptAssembler),
            Arc::new(MockChatModel::scripted(model_chunks)),
            audit.clone(),
        ));

        let ctx = ApiContext::new(
            storage.clone(),
            guard,
            fetcher,
            extractor,
            workers,
            audit,
            chat,
        );

        let app = gateway_router(ctx, &[]);
        (
            app,
            Fixture {
                storage,
                tenant_id,
                record_id,
                _audit_dir: audit_dir,
            },
        )
    }

    fn get_req(uri: &str, tenant: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(t) = tenant {
            builder = builder.header("X-Cortex-Tenant-ID", t);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn multipart_upload(
        uri: &str,
        tenant: &Uuid,
        filename: &str,
        mime: &str,
        data: &[u8],
        record_id: &Uuid,
    ) -> Request<Body> {
        let boundary = "cortexgatewaytestboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"record_id\"\r\n\r\n\
                 {record_id}\r\n\
                 --{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Cortex-Tenant-ID", tenant.to_string())
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _fx) = build(&[]);

        let response = app.oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "cortex-gateway");
    }

    #[tokio::test]
    async fn auth_failures_are_indistinguishable() {
        // Missing header, malformed id, and a valid-but-unknown id must
        // produce byte-identical responses.
        let scenarios: [Option<&str>; 3] = [
            None,
            Some("not-a-uuid"),
            Some("99999999-9999-4999-8999-999999999999"),
        ];

        let mut bodies = Vec::new();
        for tenant in scenarios {
            let (app, _fx) = build(&[]);
            let response = app
                .oneshot(get_req("/api/records/IT_LAB", tenant))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            bodies.push(body);
        }

        assert_eq!(bodies[0], bodies[1]);
        assert_eq!(bodies[1], bodies[2]);
    }

    #[tokio::test]
    async fn onboarding_save_is_public_and_returns_tenant_id() {
        let (app, _fx) = build(&[]);

        let req = Request::builder()
            .method("POST")
            .uri("/api/onboarding")
            .header("Content-Type", "application/json")
            .body(Body::from(
                r#"{"business_name":"Lex & Co","business_type":"LAW_FIRM","tone_of_voice":"professional"}"#,
            ))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert!(Uuid::parse_str(json["tenant_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn onboarding_get_returns_own_config() {
        let (app, fx) = build(&[]);

        let uri = format!("/api/onboarding/{}", fx.tenant_id);
        let response = app
            .oneshot(get_req(&uri, Some(&fx.tenant_id.to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["business_name"], "Byte Clinic");
        assert_eq!(json["business_type"], "IT_LAB");
        assert_eq!(json["tone_of_voice"], "technical");
    }

    #[tokio::test]
    async fn onboarding_get_foreign_path_is_403() {
        let (app, fx) = build(&[]);

        let other = Uuid::new_v4();
        let uri = format!("/api/onboarding/{other}");
        let response = app
            .oneshot(get_req(&uri, Some(&fx.tenant_id.to_string())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn records_list_is_tenant_scoped() {
        let (app, fx) = build(&[]);

        // Second tenant with its own record
        {
            let conn = fx.storage.conn().unwrap();
            let other = tenant_repo::insert_tenant(
                &conn,
                &Uuid::new_v4(),
                "Other Lab",
                Vertical::ItLab,
                Tone::Professional,
                &[],
                "",
            )
            .unwrap();
            record_repo::insert_record(
                &conn,
                &other.id,
                Vertical::ItLab,
                "Ticket 42",
                &serde_json::Map::new(),
            )
            .unwrap();
        }

        let response = app
            .oneshot(get_req(
                "/api/records/IT_LAB",
                Some(&fx.tenant_id.to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let records = json["records"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["display_name"], "Ticket 9");
    }

    #[tokio::test]
    async fn context_preview_returns_record_fields() {
        let (app, fx) = build(&[]);

        let uri = format!("/api/context/IT_LAB/{}", fx.record_id);
        let response = app
            .oneshot(get_req(&uri, Some(&fx.tenant_id.to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["fields"]["device"], "ThinkPad T14");
        assert!(json["label"].as_str().unwrap().contains("Ticket 9"));
    }

    #[tokio::test]
    async fn context_preview_foreign_and_missing_look_identical() {
        // Record owned by another tenant
        let (app, fx) = build(&[]);
        let foreign_record = {
            let conn = fx.storage.conn().unwrap();
            let other = tenant_repo::insert_tenant(
                &conn,
                &Uuid::new_v4(),
                "Other Lab",
                Vertical::ItLab,
                Tone::Professional,
                &[],
                "",
            )
            .unwrap();
            record_repo::insert_record(
                &conn,
                &other.id,
                Vertical::ItLab,
                "Ticket 42",
                &serde_json::Map::new(),
            )
            .unwrap()
        };

        let uri = format!("/api/context/IT_LAB/{foreign_record}");
        let foreign = app
            .clone()
            .oneshot(get_req(&uri, Some(&fx.tenant_id.to_string())))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        let foreign_body = axum::body::to_bytes(foreign.into_body(), usize::MAX)
            .await
            .unwrap();

        let uri = format!("/api/context/IT_LAB/{}", Uuid::new_v4());
        let missing = app
            .oneshot(get_req(&uri, Some(&fx.tenant_id.to_string())))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let missing_body = axum::body::to_bytes(missing.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(foreign_body, missing_body);
    }

    #[tokio::test]
    async fn owner_reads_record_other_tenant_gets_404() {
        let (app, fx) = build(&[]);

        let tenant_a = Uuid::parse_str("11111111-1111-4111-8111-111111111111").unwrap();
        let tenant_b = Uuid::parse_str("99999999-9999-4999-8999-999999999999").unwrap();
        let record = Uuid::parse_str("22222222-2222-4222-8222-222222222222").unwrap();
        {
            let conn = fx.storage.conn().unwrap();
            for (id, name) in [(tenant_a, "Tenant A"), (tenant_b, "Tenant B")] {
                tenant_repo::insert_tenant(
                    &conn,
                    &id,
                    name,
                    Vertical::ItLab,
                    Tone::Professional,
                    &[],
                    "",
                )
                .unwrap();
            }
            conn.execute(
                "INSERT INTO records (id, tenant_id, vertical, display_name, fields, created_at)
                 VALUES (?1, ?2, 'IT_LAB', 'Ticket A', '{\"status\":\"open\"}', ?3)",
                rusqlite::params![
                    record.to_string(),
                    tenant_a.to_string(),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .unwrap();
        }

        let uri = format!("/api/context/IT_LAB/{record}");
        let as_b = app
            .clone()
            .oneshot(get_req(&uri, Some(&tenant_b.to_string())))
            .await
            .unwrap();
        assert_eq!(as_b.status(), StatusCode::NOT_FOUND);

        let as_a = app
            .oneshot(get_req(&uri, Some(&tenant_a.to_string())))
            .await
            .unwrap();
        assert_eq!(as_a.status(), StatusCode::OK);
        let json = response_json(as_a).await;
        assert_eq!(json["fields"]["status"], "open");
    }

    #[tokio::test]
    async fn upload_extracts_and_masks_pii() {
        let (app, fx) = build(&[]);

        let pdf = make_test_pdf(&[
            "Repair intake for dan@lab.io covering the replacement motherboard, \
             thermal paste reapplication, and the extended diagnostics we ran overnight.",
        ]);
        let req = multipart_upload(
            "/api/documents/upload",
            &fx.tenant_id,
            "intake.pdf",
            "application/pdf",
            &pdf,
            &fx.record_id,
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["extraction_method"], "native");
        assert_eq!(json["page_count"], 1);
        assert_eq!(json["pii_detected"], true);
        assert_eq!(json["masked_entities"][0], "[EMAIL_1]");
        assert_eq!(json["storage_ok"], true);
        assert!(json["sanitized_text"].is_null());
        let preview = json["sanitized_preview"].as_str().unwrap();
        assert!(preview.contains("[EMAIL_1]"));
        assert!(!preview.contains("dan@lab.io"));

        // Row persisted with the masked text only
        let conn = fx.storage.conn().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT sanitized_text FROM document_extractions WHERE record_id = ?1",
                [fx.record_id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stored.contains("[EMAIL_1]"));
        assert!(!stored.contains("dan@lab.io"));
    }

    #[tokio::test]
    async fn upload_rejects_empty_file() {
        let (app, fx) = build(&[]);

        let req = multipart_upload(
            "/api/documents/upload",
            &fx.tenant_id,
            "empty.pdf",
            "application/pdf",
            &[],
            &fx.record_id,
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("empty"));
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_type() {
        let (app, fx) = build(&[]);

        let req = multipart_upload(
            "/api/documents/upload",
            &fx.tenant_id,
            "notes.docx",
            "application/msword",
            b"not a real document",
            &fx.record_id,
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn delete_foreign_document_is_404() {
        let (app, fx) = build(&[]);

        // Document owned by another tenant
        let foreign_doc = {
            let conn = fx.storage.conn().unwrap();
            let other = tenant_repo::insert_tenant(
                &conn,
                &Uuid::new_v4(),
                "Other Lab",
                Vertical::ItLab,
                Tone::Professional,
                &[],
                "",
            )
            .unwrap();
            let record = record_repo::insert_record(
                &conn,
                &other.id,
                Vertical::ItLab,
                "Ticket 42",
                &serde_json::Map::new(),
            )
            .unwrap();
            crate::db::repository::extraction::insert_extraction(
                &conn,
                &crate::db::repository::extraction::NewExtraction {
                    tenant_id: &other.id,
                    record_id: &record,
                    filename: "theirs.pdf",
                    mime_type: "application/pdf",
                    method: crate::extraction::ExtractionMethod::Native,
                    page_count: 1,
                    sanitized_text: "their text",
                    masked_entities: &[],
                },
            )
            .unwrap()
        };

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/documents/{foreign_doc}"))
            .header("X-Cortex-Tenant-ID", fx.tenant_id.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Row survives
        let conn = fx.storage.conn().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM document_extractions WHERE id = ?1",
                [foreign_doc.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn chat_stream_ignores_body_tenant_id() {
        let (app, fx) = build(&["All good."]);

        // The body claims a different tenant; the header wins.
        let body = format!(
            r#"{{"query":"Status of ticket 9?","business_type":"IT_LAB","record_id":"{}","tenant_id":"{}"}}"#,
            fx.record_id,
            Uuid::new_v4(),
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/stream")
            .header("X-Cortex-Tenant-ID", fx.tenant_id.to_string())
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("shield_active"));
        assert!(text.contains("All good."));
        assert!(text.contains(r#""type":"done""#));
    }

    #[tokio::test]
    async fn chat_stream_requires_auth() {
        let (app, fx) = build(&["reply"]);

        let body = r#"{"query":"hi","business_type":"IT_LAB"}"#;
        let _ = &fx;
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/stream")
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (app, _fx) = build(&[]);

        let response = app
            .oneshot(get_req("/api/nonexistent", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
