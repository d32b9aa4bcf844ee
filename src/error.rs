use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("inventory store error: {0}")]
    DataSource(#[from] sqlx::Error),

    #[error("credentials file is not readable: {}", .0.display())]
    Credentials(PathBuf),

    #[error("undefined operation: {0}")]
    UnknownOperation(String),

    #[error("unknown host: {0}")]
    HostNotFound(String),

    #[error("job submission failed: {0}")]
    Dispatch(String),

    #[error("command failed for host {host_id}: {message}")]
    JobExecution { host_id: i64, message: String },

    #[error("host {host_id} exceeded the {limit_secs}s time limit")]
    JobTimeout { host_id: i64, limit_secs: u64 },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PollerError>;
