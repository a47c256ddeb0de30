//! Share store error types

use thiserror::Error;

/// Errors that can occur while creating or resolving shares
#[derive(Error, Debug)]
pub enum ShareError {
    /// Database failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Data directory could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or hashed content could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No share with this id and kind
    #[error("Share not found: {0}")]
    NotFound(String),

    /// Submitted state is not shareable
    #[error("Invalid share state: {0}")]
    InvalidState(String),

    /// Every generated id collided with an existing one
    #[error("Failed to generate a unique share id after {0} attempts")]
    IdExhausted(usize),

    /// The blocking database task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl ShareError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type ShareResult<T> = Result<T, ShareError>;
