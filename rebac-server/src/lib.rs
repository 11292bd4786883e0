//! ReBAC server - HTTP surfaces of the relation-tuple engine
//!
//! Two routers share one engine: the read API (checks, tuple listing, expand)
//! and the write API (tuple inserts, deletes and patches). They are served on
//! separate listeners so the write port can stay private.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::*;
pub use server::RebacServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the read API router with health routes and middleware
pub fn create_read_app(server: RebacServer) -> Router {
    with_layers(routes::read_routes().merge(routes::health_routes()), server)
}

/// Create the write API router with health routes and middleware
pub fn create_write_app(server: RebacServer) -> Router {
    with_layers(routes::write_routes().merge(routes::health_routes()), server)
}

fn with_layers(router: Router<RebacServer>, server: RebacServer) -> Router {
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
