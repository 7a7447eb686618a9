//! Error types for the API client

use std::fmt;
use thiserror::Error;
use zerobyte_core::ErrorCode;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A service was called without its API key
    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Identity provider rejected the request
    #[error("{message}")]
    Auth {
        /// Provider error code, e.g. `EMAIL_NOT_FOUND`
        code: String,
        /// Human-readable explanation
        message: String,
    },

    /// Circuit breaker is open
    #[error("{0} is temporarily unavailable (circuit open after repeated failures)")]
    CircuitOpen(&'static str),

    /// Rate limited by the remote service
    #[error("Rate limited by {0} - too many requests")]
    RateLimited(&'static str),

    /// Request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Malformed content identifier
    #[error("{0}")]
    InvalidCid(String),

    /// Analysis did not complete within the polling budget
    #[error("Scan timeout: analysis {analysis_id} not completed after {attempts} polls")]
    ScanTimeout {
        /// VirusTotal analysis id
        analysis_id: String,
        /// Number of polls made
        attempts: u32,
    },

    /// Response parsed but lacked an expected field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            // Retry on connection errors, timeouts
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            // Retry on 5xx errors and 429 (rate limited)
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) => true,
            Self::CircuitOpen(_)
            | Self::RateLimited(_)
            | Self::Config(_)
            | Self::MissingApiKey(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Auth { .. }
            | Self::InvalidUrl(_)
            | Self::InvalidCid(_)
            | Self::ScanTimeout { .. }
            | Self::UnexpectedResponse(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if *status >= 500)
    }

    /// Check if the resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiResponse { status: 404, .. })
    }

    /// Closest core error code, used for CLI exit codes
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Request(_) | Self::Timeout(_) | Self::RetriesExhausted { .. } => ErrorCode::NetworkError,
            Self::CircuitOpen(_) => ErrorCode::ServiceUnavailable,
            Self::RateLimited(_) => ErrorCode::RateLimited,
            Self::ApiResponse { status: 429, .. } => ErrorCode::RateLimited,
            Self::ApiResponse { status: 401 | 403, .. } => ErrorCode::AuthError,
            Self::ApiResponse { .. } | Self::UnexpectedResponse(_) | Self::Json(_) => ErrorCode::NetworkError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Config(_) | Self::InvalidUrl(_) => ErrorCode::ConfigError,
            Self::MissingApiKey(_) => ErrorCode::MissingApiKey,
            Self::Auth { .. } => ErrorCode::AuthError,
            Self::InvalidCid(_) => ErrorCode::InvalidCid,
            Self::ScanTimeout { .. } => ErrorCode::ScanFailed,
        }
    }
}

impl From<zerobyte_core::Error> for ApiError {
    fn from(err: zerobyte_core::Error) -> Self {
        match err.code {
            ErrorCode::InvalidCid => Self::InvalidCid(err.message),
            ErrorCode::FileNotFound | ErrorCode::PermissionDenied | ErrorCode::IoError => {
                Self::Io(std::io::Error::other(err.to_string()))
            }
            _ => Self::Config(err.to_string()),
        }
    }
}

/// Error context for better debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Request ID for correlation
    pub request_id: Option<String>,
    /// Endpoint that was called
    pub endpoint: String,
    /// HTTP method used
    pub method: String,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(ref id) = self.request_id {
            write!(f, " (request_id: {id})")?;
        }
        Ok(())
    }
}
