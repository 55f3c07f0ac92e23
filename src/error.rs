use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Common result type used across the SDK.
pub type Result<T> = std::result::Result<T, TidepoolError>;

/// Semantic category of a failed call.
///
/// The set is closed: callers branch on it instead of matching messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 400/413, or input rejected locally before any request was sent.
    Validation,
    /// HTTP 404.
    NotFound,
    /// HTTP 503.
    ServiceUnavailable,
    /// Any other non-2xx status.
    Server,
}

impl ErrorKind {
    /// Map an HTTP status code onto its kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 413 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            503 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Server,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::NotFound => "not found",
            ErrorKind::ServiceUnavailable => "service unavailable",
            ErrorKind::Server => "server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail attached to every classified HTTP failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: u16,
    /// Raw response body, kept for diagnostics.
    pub body: Vec<u8>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}): {}", self.kind, self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Unified error enum surfaced by all public APIs.
#[derive(Error, Debug)]
pub enum TidepoolError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Api(ApiError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
    /// The limit is `None` when the HTTP client enforced its own timeout.
    #[error("request timed out{}", timeout_suffix(.0))]
    Timeout(Option<Duration>),
    #[error("request cancelled")]
    Cancelled,
    #[error("config error: {0}")]
    Config(String),
}

impl TidepoolError {
    /// Semantic kind, if this error belongs to the taxonomy.
    ///
    /// Local validation failures report [`ErrorKind::Validation`] just like a
    /// server-side 400.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TidepoolError::Validation(_) => Some(ErrorKind::Validation),
            TidepoolError::Api(api) => Some(api.kind),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == Some(ErrorKind::Validation)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    pub fn is_service_unavailable(&self) -> bool {
        self.kind() == Some(ErrorKind::ServiceUnavailable)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TidepoolError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TidepoolError::Timeout(_))
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            TidepoolError::Api(api) => Some(api),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.api_error().map(|api| api.status_code)
    }

    pub fn response_body(&self) -> Option<&[u8]> {
        self.api_error().map(|api| api.body.as_slice())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Classify a non-2xx response into the error taxonomy.
///
/// The message comes from a `{"error": "..."}` body when present, otherwise
/// from the HTTP reason phrase.
pub fn classify(status: u16, body: &[u8]) -> TidepoolError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status_text(status));

    TidepoolError::Api(ApiError {
        kind: ErrorKind::from_status(status),
        message,
        status_code: status,
        body: body.to_vec(),
    })
}

fn status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn timeout_suffix(limit: &Option<Duration>) -> String {
    limit.map(|d| format!(" after {d:?}")).unwrap_or_default()
}
