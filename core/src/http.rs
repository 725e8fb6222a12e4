//! HTTP values exchanged between the fetcher and its transport.
//!
//! # Design
//! Requests and responses are plain data. The fetcher assembles a
//! `TransportInit`, hands it to whatever `Transport` was injected, and gets a
//! `Response` back. Header names compare case-insensitively but keep the
//! casing and order they were first inserted with, so what a caller sets is
//! what the transport sees.
//!
//! The response body is buffered as `Bytes`. Decoding reads from memory, so
//! the error path and the success path can each decode it without consuming
//! anything the other needs.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header map with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.0[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    /// Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => {
                let (_, old) = std::mem::replace(&mut self.0[i], (name, value));
                Some(old)
            }
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    /// Add `value` under `name`, joining it onto an existing entry with
    /// `", "` the way fetch's `Headers.append` combines repeated fields.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => {
                let existing = &mut self.0[i].1;
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.0.remove(i).1)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Overlay every entry of `other` onto `self`; `other` wins key for key.
    pub fn overlay(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Cache mode forwarded to the transport. Interpretation is up to the
/// transport; the fetcher only passes it along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// Everything the transport needs to perform one call, besides the URL.
#[derive(Debug, Clone)]
pub struct TransportInit {
    pub method: Method,
    pub headers: Headers,
    pub body: Option<String>,
    pub cache: Option<CachePolicy>,
    pub signal: Option<CancellationToken>,
    /// Opaque extension bag. Seeded from `ClientConfig::provider_options`;
    /// cache tags land under `"tags"`.
    pub extensions: Map<String, Value>,
}

impl TransportInit {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Headers::new(),
            body: None,
            cache: None,
            signal: None,
            extensions: Map::new(),
        }
    }

    /// Cache tags attached to this call, if any.
    pub fn tags(&self) -> Option<Vec<&str>> {
        self.extensions
            .get("tags")?
            .as_array()
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: Headers,
    body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// A response whose body is the JSON serialization of `value`.
    pub fn from_json<T: Serialize + ?Sized>(value: &T, status: u16) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(status, body).with_header("Content-Type", "application/json"))
    }

    pub fn no_content() -> Self {
        Self::new(204, Bytes::new())
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True for any 2xx status.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
