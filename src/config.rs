use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Cortex Gateway";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on uploaded document size (20 MB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Tenant auth cache entry lifetime, in seconds.
pub const TENANT_CACHE_TTL_SECS: u64 = 300;

/// Runtime configuration, assembled from environment variables with
/// sensible local-development defaults.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub audit_log_dir: PathBuf,
    pub model_base_url: String,
    pub model_name: String,
    pub allowed_origins: Vec<String>,
    pub max_extraction_workers: usize,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let bind_addr = env_var("CORTEX_BIND_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let db_path = env_var("CORTEX_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cortex_gateway.db"));

        let audit_log_dir = env_var("CORTEX_AUDIT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("audit_logs"));

        let model_base_url = env_var("CORTEX_MODEL_URL")
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let model_name = env_var("CORTEX_MODEL_NAME").unwrap_or_else(|| "llama3.1".to_string());

        let allowed_origins = env_var("CORTEX_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let max_extraction_workers = env_var("CORTEX_MAX_WORKERS")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);

        Self {
            bind_addr,
            db_path,
            audit_log_dir,
            model_base_url,
            model_name,
            allowed_origins,
            max_extraction_workers,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
