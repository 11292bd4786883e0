use axum::{
    routing::{get, put},
    Router,
};
use crate::{
    handlers::{check, expand, health, relation_tuples},
    server::RebacServer,
};

/// Paths served by the read and write listeners
pub mod paths {
    pub const RELATION_TUPLES_WRITE: &str = "/write/relation-tuples";
    pub const RELATION_TUPLES_READ: &str = "/read/relation-tuples";
    pub const CHECK: &str = "/read/check";
    pub const CHECK_OPENAPI: &str = "/read/check/openapi";
    pub const EXPAND: &str = "/read/expand";
    pub const HEALTH_ALIVE: &str = "/health/alive";
    pub const HEALTH_READY: &str = "/health/ready";
    pub const VERSION: &str = "/version";
}

/// Create health check routes
pub fn health_routes() -> Router<RebacServer> {
    Router::new()
        .route(paths::HEALTH_ALIVE, get(health::alive))
        .route(paths::HEALTH_READY, get(health::ready))
        .route(paths::VERSION, get(health::version_info))
}

/// Create write API routes
pub fn write_routes() -> Router<RebacServer> {
    Router::new().route(
        paths::RELATION_TUPLES_WRITE,
        put(relation_tuples::create_relation_tuple)
            .post(relation_tuples::create_relation_tuple)
            .delete(relation_tuples::delete_relation_tuple)
            .patch(relation_tuples::patch_relation_tuples),
    )
}

/// Create read API routes
pub fn read_routes() -> Router<RebacServer> {
    Router::new()
        .route(paths::CHECK, get(check::get_check).post(check::post_check))
        .route(
            paths::CHECK_OPENAPI,
            get(check::get_check_openapi).post(check::post_check_openapi),
        )
        .route(paths::RELATION_TUPLES_READ, get(relation_tuples::list_relation_tuples))
        .route(paths::EXPAND, get(expand::expand))
}
