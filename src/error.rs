//! Error types for taskraffle
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, store not initialized)
//! - 4: Operation failed (I/O, lock contention, numeric overflow)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskraffle CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskraffle operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task type already exists: {0}")]
    TaskTypeExists(String),

    #[error("Task store not initialized at {0}")]
    StoreNotInitialized(PathBuf),

    // Operation failures (exit code 4)
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Errors the caller can fix by changing input or running `init`
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::InvalidArgument(_)
                | Error::TaskNotFound(_)
                | Error::TaskTypeExists(_)
                | Error::StoreNotInitialized(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_user_error() {
            exit_codes::USER_ERROR
        } else {
            exit_codes::OPERATION_FAILED
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        let (key, value) = match self {
            Error::InvalidConfig(message) => ("message", message.clone()),
            Error::TaskNotFound(id) => ("task_id", id.clone()),
            Error::TaskTypeExists(name) => ("task_type", name.clone()),
            Error::StoreNotInitialized(root) => ("root", root.to_string_lossy().into_owned()),
            Error::LockFailed(path) => ("path", path.to_string_lossy().into_owned()),
            _ => return None,
        };
        Some(serde_json::json!({ key: value }))
    }
}

/// Result type alias for taskraffle operations
pub type Result<T> = std::result::Result<T, Error>;
