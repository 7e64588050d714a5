//! Season data error types.

use seasonrisk_core::{AppError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeasonError {
    /// Non-2xx answer or transport failure while fetching a yearly file.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The readiness gate rejected instead of answering.
    #[error("Readiness gate failed: {0}")]
    Gate(String),

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl SeasonError {
    /// HTTP status of the failed fetch, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

impl From<SeasonError> for AppError {
    fn from(err: SeasonError) -> Self {
        match err {
            SeasonError::Network(e) => AppError::Network(e),
            other => AppError::Service(other.to_string()),
        }
    }
}
