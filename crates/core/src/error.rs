use thiserror::Error;

/// Errors raised by the shared domain types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("{0}")]
    Validation(String),
}
