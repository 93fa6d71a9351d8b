//! Error types for the catalog client.

use std::fmt;

/// Closed taxonomy of failures a catalog operation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400: the server rejected the request or its payload.
    BadRequest,
    /// 403: the service refused to serve the request.
    ServiceUnavailable,
    /// 404: no record under that stable identifier.
    NotFound,
    /// 409: uid already taken, or the concurrency token is stale.
    Conflict,
    /// 429: rate limited.
    TooManyRequests,
    /// 500: unspecified server-side failure.
    ServerError,
    /// Any status code without a registered kind.
    Unmapped,
    /// Local: the uid is unknown to the catalog.
    UidNotResolvable,
    /// Local: no concurrency token could be obtained.
    TokenUnavailable,
    /// Local: invalid arguments or configuration, no request was made.
    Precondition,
    /// Connection failures and malformed responses.
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::ServiceUnavailable => "service unavailable",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::TooManyRequests => "too many requests",
            Self::ServerError => "unspecified server error",
            Self::Unmapped => "server error",
            Self::UidNotResolvable => "uid not resolvable",
            Self::TokenUnavailable => "token unavailable",
            Self::Precondition => "precondition violation",
            Self::Transport => "transport failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by the server, classified from its status code.
///
/// Only [`crate::classify::classify`] constructs these, so `kind` always
/// agrees with `status`. The message is the response body, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    kind: ErrorKind,
    status: u16,
    message: String,
}

impl ClassifiedError {
    pub(crate) fn new(kind: ErrorKind, status: u16, message: String) -> Self {
        Self {
            kind,
            status,
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}): {}", self.kind, self.status, self.message)
    }
}

impl std::error::Error for ClassifiedError {}

/// Catalog client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Non-success status returned by the server.
    #[error(transparent)]
    Server(#[from] ClassifiedError),

    /// The uid is neither cached nor listed by the server.
    #[error("uid `{uid}` is not present in the file catalog")]
    UidNotResolvable { uid: String },

    /// No concurrency token for a record where one is required.
    #[error("concurrency token unavailable for `{id}`: {message}")]
    TokenUnavailable { id: String, message: String },

    /// Invalid arguments, rejected before any request.
    #[error("precondition violated: {message}")]
    Precondition { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Network error.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Success status, but the response could not be interpreted.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Server(e) => e.kind(),
            Self::UidNotResolvable { .. } => ErrorKind::UidNotResolvable,
            Self::TokenUnavailable { .. } => ErrorKind::TokenUnavailable,
            Self::Precondition { .. } | Self::Config { .. } => ErrorKind::Precondition,
            Self::Transport { .. } | Self::InvalidResponse { .. } => ErrorKind::Transport,
        }
    }

    /// HTTP status, for server-reported errors only.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Whether the error was raised by the client without a server verdict.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UidNotResolvable | ErrorKind::TokenUnavailable | ErrorKind::Precondition
        )
    }

    /// Stale token or duplicate uid. Writes recover with `force_refresh`.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether re-issuing the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TooManyRequests | ErrorKind::ServiceUnavailable | ErrorKind::Transport
        )
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
