//! Error types for dispatching and body decoding.

use thiserror::Error;

/// Boxed error returned by handlers.
///
/// Handlers may fail with any error type; the dispatcher logs it and
/// answers with a generic server error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Router-specific errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No registered handler matched the request.
    #[error("not found: {method} {path}")]
    NotFound { method: String, path: String },

    /// Invalid path pattern.
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A write was attempted after the response was sent.
    #[error("response already sent")]
    ResponseAlreadySent,
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors produced while decoding a request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body exceeded the configured ceiling.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body is neither JSON nor URL-encoded form data.
    #[error("request body is neither valid JSON nor URL-encoded form data")]
    Malformed,

    /// The multipart decoder rejected the body.
    #[error("malformed multipart body: {0}")]
    Multipart(#[source] multer::Error),

    /// The connection failed while the body was being read.
    #[error("request body stream aborted: {0}")]
    Aborted(#[source] std::io::Error),
}

impl DecodeError {
    /// HTTP status to answer with, if the connection is still usable.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PayloadTooLarge { .. } => Some(413),
            Self::Aborted(_) | Self::Multipart(multer::Error::StreamReadFailed(_)) => None,
            Self::Malformed | Self::Multipart(_) => Some(400),
        }
    }

    /// Whether the connection should be closed after answering.
    ///
    /// Oversized uploads are cut off so the client stops sending.
    pub fn closes_connection(&self) -> bool {
        matches!(self.status(), Some(413) | None)
    }
}

impl From<multer::Error> for DecodeError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit }
            | multer::Error::FieldSizeExceeded { limit, .. } => Self::PayloadTooLarge {
                limit: usize::try_from(limit).unwrap_or(usize::MAX),
            },
            other => Self::Multipart(other),
        }
    }
}
