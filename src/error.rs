use thiserror::Error;

/// Failure taxonomy shared by every store and the coordinator.
///
/// None of these are fatal; each one aborts only the operation that raised
/// it and leaves the stores as they were before the call.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} already exists")]
    NameConflict(String),
    #[error("{0} is protected")]
    Protected(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TagError>;

impl TagError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn name_conflict(subject: impl Into<String>) -> Self {
        Self::NameConflict(subject.into())
    }

    pub fn protected(subject: impl Into<String>) -> Self {
        Self::Protected(subject.into())
    }

    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::NotFound(subject.into())
    }
}
