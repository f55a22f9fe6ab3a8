//! Error types for vidlearn

use thiserror::Error;

/// Coarse classification of failures, used by the CLI to pick exit behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidConfig,

    // Network errors
    NetworkError,
    ApiError,

    // Playback errors
    PlaybackUnavailable,

    // System errors
    FileError,
    ParseError,
}

/// Main error type for vidlearn
#[derive(Error, Debug)]
pub enum VidlearnError {
    #[error("{field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Video unavailable: {0}")]
    PlaybackUnavailable(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VidlearnError {
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::PlaybackUnavailable(_) => ErrorCode::PlaybackUnavailable,
            Self::File(_) => ErrorCode::FileError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Json(_) => ErrorCode::ParseError,
        }
    }

    /// Whether the consuming page should offer a retry action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::NetworkError | ErrorCode::ApiError | ErrorCode::PlaybackUnavailable
        )
    }
}

pub type Result<T> = std::result::Result<T, VidlearnError>;
