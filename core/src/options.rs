//! Per-call options and the context threaded through request interceptors.

use std::fmt::Display;

use tokio_util::sync::CancellationToken;

use crate::http::{CachePolicy, Headers, TransportInit};

/// Per-call overrides. Build with the chained setters:
///
/// ```
/// use fetcher_core::RequestOptions;
///
/// let page: Option<u32> = None;
/// let options = RequestOptions::new()
///     .param("limit", 20)
///     .param_opt("page", page)
///     .tag("users");
/// assert_eq!(options.params.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters in insertion order. `None` values are skipped.
    pub params: Vec<(String, Option<String>)>,
    pub tags: Option<Vec<String>>,
    pub headers: Headers,
    pub cache: Option<CachePolicy>,
    pub signal: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(self, key: impl Into<String>, value: impl Display) -> Self {
        self.param_opt(key, Some(value))
    }

    /// Adds a parameter that may be absent. Absent parameters never reach
    /// the URL.
    pub fn param_opt<V: Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .get_or_insert_with(Vec::new)
            .extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn cache(mut self, cache: CachePolicy) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// The request as seen by request interceptors.
///
/// Interceptors take it by value and return the replacement. The transport
/// is called with `url` and `init` of the final context; `headers` holds
/// the merged headers the pipeline started with.
#[derive(Debug, Clone)]
pub struct InterceptorContext {
    pub headers: Headers,
    pub url: String,
    pub init: TransportInit,
}
