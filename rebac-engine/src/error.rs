use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZanzibarError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Cycle detected at {0}")]
    CycleDetected(String),

    #[error("Maximum read depth of {0} exceeded")]
    MaxDepthExceeded(u32),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ZanzibarError {
    /// Resolution guards trip on a single branch of the tuple graph and only
    /// ever mean "no match" on that branch.
    pub fn is_resolution_guard(&self) -> bool {
        matches!(
            self,
            ZanzibarError::CycleDetected(_) | ZanzibarError::MaxDepthExceeded(_)
        )
    }

    /// Errors caused by the shape of the caller's request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ZanzibarError::ValidationError(_)
                | ZanzibarError::UnknownNamespace(_)
                | ZanzibarError::InvalidPageToken(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ZanzibarError>;
