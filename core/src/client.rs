//! The fetcher: a configurable HTTP client bound to a base URL.
//!
//! # Design
//! Every verb call runs the same fixed pipeline:
//! 1. resolve the endpoint against `base_url` and set query params,
//! 2. merge headers (default, then configured, then per call),
//! 3. assemble the `TransportInit`,
//! 4. attach cache tags to the extension bag,
//! 5. fold the context through the request interceptors,
//! 6. call the transport,
//! 7. fold the response through the response interceptors,
//! 8. turn a non-2xx status into `ApiError`,
//! 9. decode the body, where 204 means "no value".
//!
//! Configuration lives behind an `Arc` and is swapped copy-on-write by
//! `set_auth`/`clear_auth`. Those take `&mut self` while calls take `&self`,
//! so a call in flight always works from one consistent snapshot.
//!
//! `extend` builds a child from a snapshot of the parent's config and
//! interceptor lists. Nothing is shared after that point except the
//! transport and the interceptor values themselves.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::{ClientConfig, ConfigOverrides};
use crate::error::{ApiError, FetchError};
use crate::http::{Headers, Method, Response, TransportInit};
use crate::interceptor::{RequestInterceptor, ResponseInterceptor};
use crate::options::{InterceptorContext, RequestOptions};
use crate::transport::{Transport, UreqTransport};

const AUTHORIZATION: &str = "Authorization";

/// Handle to a configured client.
///
/// Cloning yields an independent copy, equivalent to `extend` with no
/// overrides.
#[derive(Clone)]
pub struct Fetcher {
    config: Arc<ClientConfig>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(config: ClientConfig, transport: impl Transport) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    fn with_shared_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            transport,
        }
    }

    /// Default application client: base URL from `API_BASE_URL`, ureq
    /// transport.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env(), UreqTransport::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<Option<T>, FetchError> {
        self.request::<T, ()>(Method::Get, endpoint, None, options).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::Post, endpoint, Some(body), options).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::Put, endpoint, Some(body), options).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::Patch, endpoint, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<Option<T>, FetchError> {
        self.request::<T, ()>(Method::Delete, endpoint, None, options).await
    }

    /// Run the full pipeline and decode the result. `Ok(None)` means the
    /// server answered 204.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(FetchError::Serialize)?;
        let response = self.send(method, endpoint, body, options).await?;
        if response.status() == 204 {
            return Ok(None);
        }
        response.json().map(Some).map_err(FetchError::Decode)
    }

    /// Run the pipeline up to error translation and hand back the
    /// successful response undecoded. `body` is sent as-is.
    #[tracing::instrument(level = "debug", skip_all, fields(method = %method, endpoint = %endpoint))]
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Response, FetchError> {
        let RequestOptions {
            params,
            tags,
            headers: call_headers,
            cache,
            signal,
        } = options;
        let config = Arc::clone(&self.config);

        let url = build_url(&config.base_url, endpoint, &params)?;

        let mut headers = Headers::new().with("Content-Type", "application/json");
        headers.overlay(&config.headers);
        headers.overlay(&call_headers);

        let mut extensions = config.provider_options.clone();
        if let Some(tags) = tags {
            extensions.insert("tags".to_string(), Value::from(tags));
        }
        let init = TransportInit {
            method,
            headers: headers.clone(),
            body,
            cache,
            signal,
            extensions,
        };

        let mut ctx = InterceptorContext {
            headers,
            url: url.to_string(),
            init,
        };
        trace!(count = self.request_interceptors.len(), "running request interceptors");
        for interceptor in &self.request_interceptors {
            ctx = interceptor.intercept(ctx).await?;
        }

        debug!(url = %ctx.url, "dispatching request");
        let mut response = self.transport.fetch(ctx.url, ctx.init).await?;

        trace!(count = self.response_interceptors.len(), "running response interceptors");
        for interceptor in &self.response_interceptors {
            response = interceptor.intercept(response).await?;
        }

        debug!(status = response.status(), "received response");
        if !response.ok() {
            let data = response.json::<Value>().unwrap_or(Value::Null);
            warn!(status = response.status(), "request failed with non-success status");
            return Err(ApiError {
                status: response.status(),
                status_text: response.status_text().to_string(),
                data,
            }
            .into());
        }
        Ok(response)
    }

    /// Set `Authorization: Bearer <token>` on every later call.
    pub fn set_auth(&mut self, token: &str) -> &mut Self {
        self.set_auth_with_scheme(token, "Bearer")
    }

    pub fn set_auth_with_scheme(&mut self, token: &str, scheme: &str) -> &mut Self {
        Arc::make_mut(&mut self.config)
            .headers
            .insert(AUTHORIZATION, format!("{scheme} {token}"));
        self
    }

    /// Remove the `Authorization` header entirely.
    pub fn clear_auth(&mut self) -> &mut Self {
        if self.config.headers.contains(AUTHORIZATION) {
            Arc::make_mut(&mut self.config).headers.remove(AUTHORIZATION);
        }
        self
    }

    pub fn add_request_interceptor(&mut self, interceptor: impl RequestInterceptor) -> &mut Self {
        self.push_request_interceptor(Arc::new(interceptor))
    }

    pub fn add_response_interceptor(&mut self, interceptor: impl ResponseInterceptor) -> &mut Self {
        self.push_response_interceptor(Arc::new(interceptor))
    }

    fn push_request_interceptor(&mut self, interceptor: Arc<dyn RequestInterceptor>) -> &mut Self {
        self.request_interceptors.push(interceptor);
        self
    }

    fn push_response_interceptor(&mut self, interceptor: Arc<dyn ResponseInterceptor>) -> &mut Self {
        self.response_interceptors.push(interceptor);
        self
    }

    /// New client whose config is this one's merged with `overrides`,
    /// starting with copies of the interceptors registered so far.
    pub fn extend(&self, overrides: ConfigOverrides) -> Fetcher {
        let mut child = Fetcher::with_shared_transport(self.config.merged(overrides), Arc::clone(&self.transport));
        for interceptor in &self.request_interceptors {
            child.push_request_interceptor(Arc::clone(interceptor));
        }
        for interceptor in &self.response_interceptors {
            child.push_response_interceptor(Arc::clone(interceptor));
        }
        child
    }
}

/// Resolve `endpoint` against `base_url` and set every present param.
fn build_url(base_url: &str, endpoint: &str, params: &[(String, Option<String>)]) -> Result<Url, FetchError> {
    let base = Url::parse(base_url).map_err(|source| FetchError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;
    let mut url = base.join(endpoint).map_err(|source| FetchError::InvalidUrl {
        url: endpoint.to_string(),
        source,
    })?;
    for (key, value) in params {
        if let Some(value) = value {
            set_query_param(&mut url, key, value);
        }
    }
    Ok(url)
}

/// Set semantics: the first `key` pair takes the new value, later ones are
/// dropped, and a missing key is appended.
fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut found = false;
    pairs.retain_mut(|(k, v)| {
        if k != key {
            return true;
        }
        if found {
            return false;
        }
        found = true;
        *v = value.to_string();
        true
    });
    if !found {
        pairs.push((key.to_string(), value.to_string()));
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
}
