//! Message body shared by [`Request`](crate::Request) and [`Response`](crate::Response).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, HttpError};

/// A request or response body.
///
/// peel does not parse bodies eagerly. Transports hand over raw [`Bytes`],
/// sub-requests usually pass text or a JSON value, and middleware decodes
/// on demand with [`Body::json`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    /// A structured value, serialized as JSON on the wire.
    Json(Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Json(_) => false,
        }
    }

    /// The body as text, if it is a `Text` body or valid UTF-8 bytes.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Decodes the body into `T`.
    ///
    /// An empty or malformed body is the client's fault, so it fails with
    /// `400 Bad Request`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let parsed: Result<T, serde_json::Error> = match self {
            Self::Empty => return Err(HttpError::bad_request().with_message("empty body").into()),
            Self::Text(s) => serde_json::from_str(s),
            Self::Bytes(b) => serde_json::from_slice(b),
            Self::Json(v) => serde::Deserialize::deserialize(v),
        };
        parsed.map_err(|e| HttpError::bad_request().with_message(e.to_string()).into())
    }

    /// Wire representation.
    pub fn into_bytes(self) -> Result<Bytes, Error> {
        Ok(match self {
            Self::Empty => Bytes::new(),
            Self::Text(s) => Bytes::from(s),
            Self::Bytes(b) => b,
            Self::Json(v) => Bytes::from(serde_json::to_vec(&v)?),
        })
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        if b.is_empty() { Self::Empty } else { Self::Bytes(b) }
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self { Bytes::from(b).into() }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        if v.is_null() { Self::Empty } else { Self::Json(v) }
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self { Self::Empty }
}
