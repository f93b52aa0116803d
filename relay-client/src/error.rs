//! Client error types

use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket connect / IO failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Relay answered with an error body
    #[error("Relay error {code}: {message}")]
    Api { code: ErrorCode, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local validation failed (before anything was sent)
    #[error("Validation error: {0}")]
    Validation(#[from] AppError),

    /// Session is not running or the outbound queue is full
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(e))
    }
}

impl ClientError {
    /// Error code, if the relay returned one or the request timed out
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            ClientError::Validation(e) => Some(e.code),
            ClientError::Http(e) if e.is_timeout() => Some(ErrorCode::TimeoutError),
            _ => None,
        }
    }
}


/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
