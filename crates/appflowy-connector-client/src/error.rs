//! Error types of the client.

use appflowy_connector_core::StoreError;

/// Failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// HTTP client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// Connection, DNS, TLS, or timeout failure
    #[error("request error: {0}")]
    Connect(String),
    /// Server answered with a non-2xx status
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Response body was not valid JSON
    #[error("parse error: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced by client operations.
///
/// The host decides per item whether an error aborts the run or is recorded
/// and skipped; nothing in this crate swallows errors on its own.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The password grant was rejected
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The server kept answering 401 after re-authenticating once
    #[error("authorization expired for {operation} after re-authentication")]
    AuthorizationExpired {
        /// Method and path of the failed call
        operation: String,
    },
    /// Transport failure, non-2xx status, or malformed response
    #[error("{operation} failed: {cause}")]
    Request {
        /// Method and path of the failed call
        operation: String,
        /// Underlying transport error
        #[source]
        cause: TransportError,
    },
    /// Caller-supplied input was invalid; no request was sent
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Node state could not be read or written
    #[error(transparent)]
    State(#[from] StoreError),
}

impl ApiError {
    /// Wrap a transport error with the operation it belongs to.
    #[must_use]
    pub fn request(operation: impl Into<String>, cause: TransportError) -> Self {
        Self::Request {
            operation: operation.into(),
            cause,
        }
    }
}
