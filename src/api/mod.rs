//! HTTP API surface of the gateway.
//!
//! Routes live under `/api/` and, apart from onboarding save, sit
//! behind the tenant auth guard: Extension → Auth → Access log →
//! Handler. `gateway_router()` returns a composable `Router` so tests
//! can drive it without a socket.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::gateway_router;
pub use server::{start_gateway, GatewayServer};
pub use types::ApiContext;
