//! Case-insensitive header collection shared by requests and responses.

use std::borrow::Cow;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::Error;

/// HTTP headers.
///
/// Names are case-insensitive. A header may hold several values; [`get`]
/// returns them joined with `,`, which is how they would appear folded onto
/// one line.
///
/// ```rust
/// use peel::Headers;
///
/// let mut h = Headers::new();
/// h.append("Accept", "text/html").unwrap();
/// h.append("accept", "application/json").unwrap();
/// assert_eq!(h.get("ACCEPT").as_deref(), Some("text/html,application/json"));
/// ```
///
/// [`get`]: Headers::get
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    inner: HeaderMap,
}

impl Headers {
    pub fn new() -> Self {
        Self { inner: HeaderMap::new() }
    }

    /// Builds a collection from `(name, value)` pairs. Repeated names append.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name.as_ref(), value.as_ref())?;
        }
        Ok(headers)
    }

    /// Returns every value for `name` joined with `,`, or `None` if absent.
    ///
    /// Non-ASCII bytes are decoded as UTF-8, lossily.
    pub fn get(&self, name: &str) -> Option<String> {
        let mut values = self.inner.get_all(name).iter().map(decode);
        let first = values.next()?;
        Some(values.fold(first.into_owned(), |mut joined, v| {
            joined.push(',');
            joined.push_str(&v);
            joined
        }))
    }

    /// Replaces all values of `name` with `value`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = parse(name, value)?;
        self.inner.insert(name, value);
        Ok(())
    }

    /// Adds `value` to `name`, keeping existing values.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = parse(name, value)?;
        self.inner.append(name, value);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Removes every value of `name`. Returns whether anything was removed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.inner.keys_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates `(name, value)` pairs, one per value. Names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Cow<'_, str>)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), decode(v)))
    }
}

impl From<HeaderMap> for Headers {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

impl From<Headers> for HeaderMap {
    fn from(headers: Headers) -> Self {
        headers.inner
    }
}

fn decode(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

fn parse(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::InvalidHeader(name.to_owned()))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidHeader(format!("{name}: {value}")))?;
    Ok((name, value))
}
