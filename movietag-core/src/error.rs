use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Service not available (HTTP {0})")]
    ServiceUnavailable(u16),

    #[error("Cannot reach metadata service: {0}")]
    Unreachable(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl AppError {
    /// Process exit code reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Unreachable(_) => 2,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // DNS 解析失败和连接被拒都归为不可达
        if err.is_connect() {
            AppError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::ServiceUnavailable(status.as_u16())
        } else {
            AppError::Metadata(err.to_string())
        }
    }
}
