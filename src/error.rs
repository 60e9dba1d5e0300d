//! Error types for remindr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in remindr
#[derive(Debug, Error)]
pub enum RemindrError {
    /// Task not found in storage
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    /// User not found in storage
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Task attributes rejected at creation time
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// User settings rejected on update
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Free-form user input could not be parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for remindr operations
pub type Result<T> = std::result::Result<T, RemindrError>;
