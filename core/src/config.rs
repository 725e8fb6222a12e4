//! Client configuration and the overrides accepted by `Fetcher::extend`.

use serde_json::{Map, Value};
use tracing::debug;

use crate::http::Headers;

/// Environment variable read by `ClientConfig::from_env`.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Base configuration a `Fetcher` is bound to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Headers sent with every call, including `Authorization` once set.
    pub headers: Headers,
    /// Opaque bag forwarded to the transport as `TransportInit::extensions`.
    pub provider_options: Map<String, Value>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads the base URL from `API_BASE_URL`. An unset variable yields an
    /// empty base URL, which fails at call time like any unresolvable URL.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_default();
        debug!(base_url = %base_url, "loaded client config from environment");
        Self::new(base_url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_provider_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.provider_options.insert(key.into(), value.into());
        self
    }

    /// Shallow merge: present overrides replace, headers merge key by key.
    pub(crate) fn merged(&self, overrides: ConfigOverrides) -> ClientConfig {
        let mut headers = self.headers.clone();
        headers.overlay(&overrides.headers);
        ClientConfig {
            base_url: overrides.base_url.unwrap_or_else(|| self.base_url.clone()),
            headers,
            provider_options: overrides
                .provider_options
                .unwrap_or_else(|| self.provider_options.clone()),
        }
    }
}

/// Partial configuration layered over a parent by `Fetcher::extend`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub headers: Headers,
    pub provider_options: Option<Map<String, Value>>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn provider_options(mut self, options: Map<String, Value>) -> Self {
        self.provider_options = Some(options);
        self
    }
}
