//! The network primitive the fetcher delegates I/O to.
//!
//! # Design
//! `Transport` is the single seam between request shaping and the network.
//! The fetcher never looks past it, so a test double, a recording stub, or
//! a real HTTP client can be dropped in without touching the pipeline.
//!
//! `UreqTransport` is the default. ureq is blocking, so each call runs on
//! tokio's blocking pool; a cancellation token races that task and wins
//! with `TransportError::Cancelled`. A cancelled call stops waiting but the
//! blocking read finishes in the background.
//!
//! Whatever the request interceptors leave in `TransportInit` is sent as is,
//! including a body on GET or DELETE. Response bodies are read in full up to
//! `body_limit`, which is unbounded unless set, and repeated response
//! headers are joined with `", "`.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::TransportError;
use crate::http::{Headers, Method, Response, TransportInit};
use crate::interceptor::BoxFuture;

/// Injectable fetch-like primitive: `(url, init) -> Response`.
///
/// Contract:
/// - Must report any HTTP status as a `Response`, success or not.
/// - Fails only when no response could be obtained.
pub trait Transport: Send + Sync + 'static {
    fn fetch(&self, url: String, init: TransportInit) -> BoxFuture<'_, Result<Response, TransportError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(String, TransportInit) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn fetch(&self, url: String, init: TransportInit) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(self(url, init))
    }
}

/// Blocking HTTP transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    /// Wrap an existing agent. The agent must be built with
    /// `http_status_as_error(false)` so 4xx/5xx come back as responses.
    pub fn new(agent: ureq::Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Cap on how many response body bytes are buffered. A larger body
    /// fails the call with a `TransportError`. Defaults to no cap.
    pub fn with_body_limit(mut self, body_limit: u64) -> Self {
        self.body_limit = body_limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::new(agent)
    }
}

impl Transport for UreqTransport {
    fn fetch(&self, url: String, init: TransportInit) -> BoxFuture<'_, Result<Response, TransportError>> {
        let agent = self.agent.clone();
        let body_limit = self.body_limit;
        Box::pin(async move {
            let signal = init.signal.clone();
            if signal.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(TransportError::Cancelled);
            }
            if init.cache.is_some() || !init.extensions.is_empty() {
                trace!("ureq transport ignores cache policy and extensions");
            }

            let task = tokio::task::spawn_blocking(move || execute(&agent, &url, &init, body_limit));
            let joined = match signal {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(TransportError::Cancelled),
                    joined = task => joined,
                },
                None => task.await,
            };
            joined.map_err(TransportError::new)?
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

/// Execute one request with ureq and buffer the response.
fn execute(
    agent: &ureq::Agent,
    url: &str,
    init: &TransportInit,
    body_limit: u64,
) -> Result<Response, TransportError> {
    let headers = &init.headers;
    let body = init.body.as_deref();

    let mut response = match (init.method, body) {
        (Method::Get, Some(body)) => with_headers(agent.get(url), headers)
            .force_send_body()
            .send(body.as_bytes()),
        (Method::Get, None) => with_headers(agent.get(url), headers).call(),
        (Method::Delete, Some(body)) => with_headers(agent.delete(url), headers)
            .force_send_body()
            .send(body.as_bytes()),
        (Method::Delete, None) => with_headers(agent.delete(url), headers).call(),
        (Method::Post, Some(body)) => with_headers(agent.post(url), headers).send(body.as_bytes()),
        (Method::Post, None) => with_headers(agent.post(url), headers).send_empty(),
        (Method::Put, Some(body)) => with_headers(agent.put(url), headers).send(body.as_bytes()),
        (Method::Put, None) => with_headers(agent.put(url), headers).send_empty(),
        (Method::Patch, Some(body)) => with_headers(agent.patch(url), headers).send(body.as_bytes()),
        (Method::Patch, None) => with_headers(agent.patch(url), headers).send_empty(),
    }
    .map_err(TransportError::new)?;

    let status = response.status();
    let mut response_headers = Headers::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            response_headers.append(name.as_str(), value);
        }
    }
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_vec()
        .map_err(TransportError::new)?;

    Ok(Response::new(status.as_u16(), body)
        .with_status_text(status.canonical_reason().unwrap_or_default())
        .with_headers(response_headers))
}
