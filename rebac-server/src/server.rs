use crate::config::ServerConfig;
use rebac_engine::repository::{InMemoryTupleRepository, TupleRepository};
use rebac_engine::AuthorizationEngine;
use std::sync::Arc;
use std::time::Instant;

/// Shared state of the read and write listeners
#[derive(Clone)]
pub struct RebacServer {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Relation-tuple engine backing both APIs
    pub engine: Arc<AuthorizationEngine>,
    started_at: Instant,
}

impl RebacServer {
    /// Create a server backed by the in-memory tuple store
    pub fn new(config: ServerConfig) -> Self {
        Self::with_repository(config, Arc::new(InMemoryTupleRepository::new()))
    }

    pub fn with_repository(config: ServerConfig, repository: Arc<dyn TupleRepository>) -> Self {
        let engine = AuthorizationEngine::with_config(repository, config.engine.clone());
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
