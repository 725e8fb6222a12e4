//! Configurable HTTP request layer.
//!
//! # Overview
//! A `Fetcher` is bound to a base URL and a set of default headers. Each
//! verb call shapes the request (URL, query, headers, JSON body, cache tags),
//! runs it through the registered request interceptors, hands it to an
//! injected `Transport`, runs the response interceptors, and translates a
//! non-2xx status into a typed `ApiError`.
//!
//! # Design
//! - The transport is a trait object, so the real network client, a test
//!   double, or anything fetch-like can be swapped in.
//! - Interceptors are ordered lists of values; each one returns a full
//!   replacement of what it was given, so order is the only thing that
//!   changes behavior.
//! - `extend` copies the parent's config and interceptor lists at call time;
//!   the child and the parent diverge from then on.
//! - No caching, retries, or pooling happens here.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod options;
pub mod transport;

pub use client::Fetcher;
pub use config::{ClientConfig, ConfigOverrides};
pub use error::{ApiError, FetchError, TransportError};
pub use http::{CachePolicy, Headers, Method, Response, TransportInit};
pub use interceptor::{RequestInterceptor, ResponseInterceptor};
pub use options::{InterceptorContext, RequestOptions};
pub use transport::{Transport, UreqTransport};

/// Build a fetcher for `config` on the default ureq transport.
pub fn create(config: ClientConfig) -> Fetcher {
    Fetcher::new(config, UreqTransport::default())
}
