//! Gateway entry point: wire the pipeline together and serve HTTP.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cortex_gateway::api::{start_gateway, ApiContext};
use cortex_gateway::audit::AuditLogger;
use cortex_gateway::chat::{ChatOrchestrator, OllamaChatModel};
use cortex_gateway::config::GatewayConfig;
use cortex_gateway::context::ContextFetcher;
use cortex_gateway::db::Storage;
use cortex_gateway::extraction::pdf::PdfExtractTextLayer;
use cortex_gateway::extraction::pdfium::PdfiumRenderer;
use cortex_gateway::extraction::types::OcrEngine;
use cortex_gateway::extraction::DocumentExtractor;
use cortex_gateway::prompt::PromptAssembler;
use cortex_gateway::tenant::TenantGuard;
use cortex_gateway::worker::WorkerPool;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!(?config, "starting cortex-gateway");

    let storage = Storage::open(&config.db_path)?;

    let renderer = PdfiumRenderer::new()?;
    let ocr: Box<dyn OcrEngine + Send + Sync> = build_ocr();
    let extractor = Arc::new(DocumentExtractor::new(
        Box::new(PdfExtractTextLayer),
        Box::new(renderer),
        ocr,
    ));

    let guard = Arc::new(TenantGuard::new(storage.clone()));
    let fetcher = Arc::new(ContextFetcher::new(storage.clone()));
    let workers = WorkerPool::new(config.max_extraction_workers);
    let audit = Arc::new(AuditLogger::new(&config.audit_log_dir));
    let model = Arc::new(OllamaChatModel::new(
        &config.model_base_url,
        &config.model_name,
    ));
    let chat = Arc::new(ChatOrchestrator::new(
        fetcher.clone(),
        Arc::new(PromptAssembler),
        model,
        audit.clone(),
    ));

    let ctx = ApiContext::new(storage, guard, fetcher, extractor, workers, audit, chat);

    let mut server = start_gateway(ctx, config.bind_addr, &config.allowed_origins).await?;
    tracing::info!(addr = %server.addr, "cortex-gateway ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");
    server.shutdown();

    Ok(())
}

#[cfg(feature = "ocr")]
fn build_ocr() -> Box<dyn OcrEngine + Send + Sync> {
    Box::new(cortex_gateway::extraction::ocr::TesseractOcr::new())
}

#[cfg(not(feature = "ocr"))]
fn build_ocr() -> Box<dyn OcrEngine + Send + Sync> {
    tracing::warn!("built without the `ocr` feature; scanned documents will be rejected");
    Box::new(cortex_gateway::extraction::ocr::NoOcr)
}
