//! Error types for the load testing engine.
//!
//! [`LoadTestError`] covers everything that can go wrong before a batch
//! starts (config parsing, validation, request construction). Per-request
//! failures are [`RequestError`] values: they never abort a batch and end up
//! in the aggregate report's error sequence.

/// Errors that occur during configuration parsing, validation, or file I/O.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed successfully but
    /// contains invalid values (e.g., a relative URL or an unknown method).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// The request template could not be built (bad method, URL, or header).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The HTTP transport could not be constructed.
    #[error("Failed to build HTTP transport: {message}")]
    TransportSetup { message: String },
}

/// Transport-level failure returned by [`Transport::send`].
///
/// [`Transport::send`]: crate::loadtest::transport::Transport::send
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request exceeded the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Any other failure while sending the request or reading the response.
    #[error("Request error: {message}")]
    Request { message: String },
}

impl TransportError {
    /// Returns the error category as a static string for metrics classification.
    ///
    /// Categories: `"timeout"`, `"connection"`, `"request"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
            Self::Request { .. } => "request",
        }
    }

    /// Classify a [`reqwest::Error`] into the appropriate [`TransportError`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else {
            Self::Request {
                message: err.to_string(),
            }
        }
    }
}

/// Descriptive failure produced by an [`Expectation`].
///
/// [`Expectation`]: crate::loadtest::expectation::Expectation
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExpectationError {
    message: String,
}

impl ExpectationError {
    /// Creates a new expectation failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a single job, recorded in the aggregate report.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The transport could not deliver the request or read the response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response was received but failed a registered expectation.
    #[error("expectation '{expectation}' failed: {source}")]
    Validation {
        /// Name of the first expectation that failed.
        expectation: String,
        #[source]
        source: ExpectationError,
    },
}

impl RequestError {
    /// Returns the error category as a static string for metrics classification.
    ///
    /// Transport failures report their own category; validation failures
    /// are always `"validation"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Transport(err) => err.error_category(),
            Self::Validation { .. } => "validation",
        }
    }

    /// Returns `true` if the response was received but failed validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_timeout() {
        assert_eq!(TransportError::Timeout.error_category(), "timeout");
    }

    #[test]
    fn test_error_category_connection() {
        let err = TransportError::Connection {
            message: "DNS resolution failed".to_string(),
        };
        assert_eq!(err.error_category(), "connection");
    }

    #[test]
    fn test_error_category_request() {
        let err = TransportError::Request {
            message: "body read failed".to_string(),
        };
        assert_eq!(err.error_category(), "request");
    }

    #[test]
    fn test_request_error_category_delegates_to_transport() {
        let err = RequestError::from(TransportError::Timeout);
        assert_eq!(err.error_category(), "timeout");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_error_display_names_expectation() {
        let err = RequestError::Validation {
            expectation: "status == 200".to_string(),
            source: ExpectationError::new("got 503"),
        };
        assert_eq!(err.error_category(), "validation");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "expectation 'status == 200' failed: got 503");
    }

    #[test]
    fn test_transport_error_display_is_transparent() {
        let err = RequestError::from(TransportError::Connection {
            message: "refused".to_string(),
        });
        assert_eq!(err.to_string(), "Connection error: refused");
    }
}
