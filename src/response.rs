//! Outgoing HTTP response type.
//!
//! A [`Response`] is created empty (`200 OK`, no headers, no body) at the
//! start of a dispatch and filled in by middleware through
//! [`Context::response`](crate::Context::response).

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::body::Body;
use crate::error::Error;
use crate::headers::Headers;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for [`Response::set_content_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    HalJson,      // application/hal+json
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    ProblemJson,  // application/problem+json  (RFC 9457)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::HalJson     => "application/hal+json",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::ProblemJson => "application/problem+json",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str { self.as_str() }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An HTTP response under construction.
///
/// ```rust
/// use peel::{ContentType, Response, StatusCode};
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.set_content_type(ContentType::Text).unwrap();
/// res.set_body("made it");
///
/// assert_eq!(res.content_type().as_deref(), Some("text/plain; charset=utf-8"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Headers,
    pub(crate) body: Body,
}

impl Response {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: Headers::new(), body: Body::Empty }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn set_status(&mut self, status: StatusCode) { self.status = status; }

    pub fn headers(&self) -> &Headers { &self.headers }
    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }

    pub fn body(&self) -> &Body { &self.body }
    pub fn set_body(&mut self, body: impl Into<Body>) { self.body = body.into(); }

    /// Serializes `value` into a structured body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.body = serde_json::to_value(value)?.into();
        Ok(())
    }

    /// Removes and returns the body, leaving it empty.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    pub fn content_type(&self) -> Option<String> {
        self.headers.get("content-type")
    }

    pub fn set_content_type(&mut self, content_type: impl AsRef<str>) -> Result<(), Error> {
        self.headers.set("content-type", content_type.as_ref())
    }

    /// Converts into the `http` crate's response for a transport to write.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>, Error> {
        let mut res = http::Response::new(Full::new(self.body.into_bytes()?));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers.into();
        Ok(res)
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}
