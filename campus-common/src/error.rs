//! Common error types for campus services

use thiserror::Error;

/// Common result type for campus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across campus microservices
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed (after the single refresh-and-retry)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend returned a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a non-success backend response into an error.
    ///
    /// The backend signals not-found either through a 404 status or through
    /// a "not found" substring in the error message body, so both are mapped
    /// to `Error::NotFound`. Server errors (5xx) are reduced to a generic
    /// message; raw backend detail is never surfaced for them.
    pub fn classify_response(status: reqwest::StatusCode, body: &str) -> Error {
        if status == reqwest::StatusCode::NOT_FOUND
            || body.to_ascii_lowercase().contains("not found")
        {
            return Error::NotFound(format!("backend returned {}: {}", status, body));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Unauthorized(format!("backend returned {}", status));
        }
        if status.is_server_error() {
            return Error::InvalidResponse(format!(
                "backend error {} (try again later)",
                status
            ));
        }
        // Remaining 4xx: prefer the structured message over the raw body
        let detail = serde_json::from_str::<crate::api::ApiErrorBody>(body)
            .map(|b| b.sanitized_message())
            .unwrap_or_else(|_| body.to_string());
        Error::InvalidResponse(format!("backend returned {}: {}", status, detail))
    }

    /// True when the error means the resource is already gone on the backend
    /// and the caller can treat the operation as resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
