//! Gateway server lifecycle.
//!
//! Binds the listener, mounts the router, and runs axum in a
//! background task. The returned handle carries the bound address
//! (useful with port 0 in tests) and a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::gateway_router;
use crate::api::types::ApiContext;

/// Handle to a running gateway server.
pub struct GatewayServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GatewayServer {
    /// Shut down the server gracefully. Safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("gateway shutdown signal sent");
        }
    }
}

/// Bind and start the gateway on `bind_addr`.
pub async fn start_gateway(
    ctx: ApiContext,
    bind_addr: SocketAddr,
    allowed_origins: &[String],
) -> Result<GatewayServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = gateway_router(ctx, allowed_origins);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("gateway received shutdown signal");
        };

        tracing::info!(%addr, "gateway listening");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!(error = %e, "gateway server error");
        }

        tracing::info!("gateway stopped");
    });

    Ok(GatewayServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}
