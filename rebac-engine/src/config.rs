use serde::{Deserialize, Serialize};

/// Tuning knobs for the tuple engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest subject-set chain a check or expand will follow
    pub max_read_depth: u32,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Sibling subject-set checks evaluated at once; 1 disables fan-out
    pub check_concurrency: usize,
    /// Known namespaces; empty accepts every namespace
    pub namespaces: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_read_depth: 5,
            default_page_size: 100,
            max_page_size: 1000,
            check_concurrency: 8,
            namespaces: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Depth bound for one request: a request may only tighten the global bound
    pub fn effective_depth(&self, requested: u32) -> u32 {
        if requested == 0 || requested > self.max_read_depth {
            self.max_read_depth
        } else {
            requested
        }
    }

    pub fn effective_page_size(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_page_size.max(1)
        } else {
            requested.min(self.max_page_size.max(1))
        }
    }
}
