//! Error types for API tests

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{method} {url} returned {status}: {body}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Core(#[from] ciprobe_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Broken test data setup, as opposed to a misbehaving server
    pub fn is_setup_error(&self) -> bool {
        match self {
            E2eError::Core(e) => e.is_structural(),
            E2eError::Config(_) | E2eError::Toml(_) => true,
            _ => false,
        }
    }

    /// HTTP status of an unexpected response
    pub fn status(&self) -> Option<u16> {
        match self {
            E2eError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
