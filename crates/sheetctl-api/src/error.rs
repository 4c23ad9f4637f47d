//! Error types for authentication and Sheets API operations.

use std::fmt;
use thiserror::Error;

/// The category of an API error.
///
/// This enum provides a high-level classification of errors for use in
/// caller-side retry decisions and user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// Missing or malformed local configuration (credentials file, config).
    ConfigurationError,
    /// Token file read/write failure.
    StorageError,
    /// Authorization failed - consent denied or code exchange rejected.
    AuthorizationFailed,
    /// Authentication failed - bearer token invalid or expired.
    AuthenticationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (400) - bad range, malformed request.
    BadRequest,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ApiErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::StorageError => "storage_error",
            Self::AuthorizationFailed => "authorization_failed",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred during authentication or a Sheets API call.
#[derive(Debug, Error)]
pub struct ApiError {
    /// The error code categorizing this error.
    code: ApiErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The step that failed (e.g., "load credentials", "exchange code").
    step: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            step: None,
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ConfigurationError, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::StorageError, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::AuthorizationFailed, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    /// Sets the failing step for this error.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ApiErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failing step, if set.
    pub fn step(&self) -> Option<&str> {
        self.step.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref step) = self.step {
            write!(f, "[{}] ", step)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for authentication and Sheets operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(ApiErrorCode::NetworkError.is_retryable());
        assert!(ApiErrorCode::RateLimited.is_retryable());
        assert!(ApiErrorCode::ServerError.is_retryable());
        assert!(!ApiErrorCode::ConfigurationError.is_retryable());
        assert!(!ApiErrorCode::AuthorizationFailed.is_retryable());
        assert!(!ApiErrorCode::StorageError.is_retryable());
    }

    #[test]
    fn error_code_display() {
        assert_eq!(
            ApiErrorCode::AuthorizationFailed.as_str(),
            "authorization_failed"
        );
        assert_eq!(ApiErrorCode::StorageError.as_str(), "storage_error");
    }

    #[test]
    fn api_error_creation() {
        let err = ApiError::authorization("code exchange rejected");
        assert_eq!(err.code(), ApiErrorCode::AuthorizationFailed);
        assert_eq!(err.message(), "code exchange rejected");
        assert!(err.step().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn api_error_with_step() {
        let err = ApiError::network("connection timeout").with_step("exchange code");
        assert_eq!(err.code(), ApiErrorCode::NetworkError);
        assert_eq!(err.step(), Some("exchange code"));
        assert!(err.is_retryable());
    }

    #[test]
    fn api_error_display() {
        let err = ApiError::storage("disk full").with_step("save token");
        let display = format!("{}", err);
        assert!(display.contains("[save token]"));
        assert!(display.contains("storage_error"));
        assert!(display.contains("disk full"));
    }

    #[test]
    fn api_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("permission denied");
        let err = ApiError::storage("failed to write token file").with_source(io_err);
        assert!(err.source().is_some());
    }
}
