//! Incoming HTTP request type.

use http::Method;
use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::error::Error;
use crate::headers::Headers;

/// An HTTP request, either received by a transport or built in memory for a
/// sub-request.
///
/// ```rust
/// use peel::{Method, Request};
///
/// let req = Request::new(Method::POST, "/users?notify=1")
///     .with_header("content-type", "application/json").unwrap()
///     .with_body(r#"{"name":"alice"}"#);
///
/// assert_eq!(req.path(), "/users");
/// assert_eq!(req.query(), Some("notify=1"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Headers,
    pub(crate) body: Body,
}

impl Request {
    /// An in-memory request with no headers and an empty body.
    ///
    /// `target` may carry a query string after `?`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_owned(),
            query,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        self.headers.append(name, value)?;
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &Headers { &self.headers }
    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }
    pub fn body(&self) -> &Body { &self.body }

    /// Case-insensitive single header lookup; multiple values come back
    /// comma-joined.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }

    /// The `content-type` header.
    pub fn content_type(&self) -> Option<String> {
        self.headers.get("content-type")
    }

    /// Decodes the body as JSON. Fails with `400 Bad Request`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.body.json()
    }

    pub(crate) fn from_http(parts: http::request::Parts, body: bytes::Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers.into(),
            body: body.into(),
        }
    }
}
