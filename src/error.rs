//! Unified error type and HTTP classification.
//!
//! A middleware fails by returning `Err(Error)`. The failure travels up through
//! every awaiting [`Next::run`](crate::Next::run) until something handles it.
//! If nothing does, the catch boundary ([`Application::sub_request`] or the
//! [`Server`](crate::Server)) turns it into a response:
//!
//! - [`Error::Http`] carries a status code, and that code is sent.
//! - Everything else becomes `500 Internal Server Error`.
//!
//! [`Application::sub_request`]: crate::Application::sub_request

use std::fmt;

use http::StatusCode;

use crate::response::Response;

/// A boxed, thread-safe error from outside this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by middleware and by peel's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A failure that carries its own HTTP status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A header name or value that is not valid on the wire.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[source] BoxError),
}

impl Error {
    /// Wraps any error as an unclassified failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// The HTTP status this failure carries, if it is HTTP-classified.
    ///
    /// Only [`Error::Http`] carries a status. Callers map `None` to 500.
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

// ── HttpError ─────────────────────────────────────────────────────────────────

/// A failure with a structured HTTP status code.
///
/// ```rust
/// use peel::{Context, Error, HttpError};
///
/// fn require_auth(ctx: &Context) -> Result<(), Error> {
///     if ctx.request.headers().has("authorization") {
///         Ok(())
///     } else {
///         Err(HttpError::unauthorized().into())
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, message: None }
    }

    /// Attaches a human-readable detail, shown by `Display` and in logs.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }

    pub fn bad_request() -> Self { Self::new(StatusCode::BAD_REQUEST) }
    pub fn unauthorized() -> Self { Self::new(StatusCode::UNAUTHORIZED) }
    pub fn forbidden() -> Self { Self::new(StatusCode::FORBIDDEN) }
    pub fn not_found() -> Self { Self::new(StatusCode::NOT_FOUND) }
    pub fn method_not_allowed() -> Self { Self::new(StatusCode::METHOD_NOT_ALLOWED) }
    pub fn conflict() -> Self { Self::new(StatusCode::CONFLICT) }
    pub fn unprocessable() -> Self { Self::new(StatusCode::UNPROCESSABLE_ENTITY) }
    pub fn internal() -> Self { Self::new(StatusCode::INTERNAL_SERVER_ERROR) }
    pub fn service_unavailable() -> Self { Self::new(StatusCode::SERVICE_UNAVAILABLE) }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http {}", self.status)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

// ── Failure ───────────────────────────────────────────────────────────────────

/// How an uncaught failure maps onto HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The failure carried this status.
    Http(StatusCode),
    /// No status attached; reported as 500.
    Unclassified,
}

impl FailureKind {
    pub fn of(err: &Error) -> Self {
        match err.http_status() {
            Some(status) => Self::Http(status),
            None => Self::Unclassified,
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::Http(status) => status,
            Self::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An uncaught failure from a sub-request, with the response as the chain
/// left it.
///
/// Returned by [`Application::try_sub_request`](crate::Application::try_sub_request).
#[derive(Debug)]
pub struct Failure {
    pub(crate) error: Error,
    pub(crate) kind: FailureKind,
    pub(crate) response: Response,
}

impl Failure {
    pub(crate) fn new(error: Error, response: Response) -> Self {
        let kind = FailureKind::of(&error);
        Self { error, kind, response }
    }

    pub fn error(&self) -> &Error { &self.error }
    pub fn kind(&self) -> FailureKind { self.kind }

    /// The response exactly as the middleware chain left it.
    pub fn partial_response(&self) -> &Response { &self.response }

    /// Rewrites the response into the generic diagnostic reply: the
    /// classified status and a fixed body naming it.
    pub fn into_response(self) -> Response {
        let status = self.kind.status();
        let mut response = self.response;
        response.set_status(status);
        response.set_body(format!(
            "Uncaught exception. No middleware was defined to handle it. \
             We got the following HTTP status: {}",
            status.as_u16()
        ));
        response
    }

    pub fn into_error(self) -> Error { self.error }
}
