//! Error types for the fetcher.
//!
//! # Design
//! Three failure classes reach the caller and none is recovered here:
//! - `TransportError`: the transport itself failed (connection, DNS, abort).
//!   It is carried unchanged inside `FetchError::Transport`.
//! - `ApiError`: the transport answered but the status was not 2xx. The body
//!   is decoded best-effort; anything that is not JSON becomes `null`.
//! - `FetchError::Decode`: a 2xx body that does not decode as the caller's
//!   type. This is never turned into an `ApiError`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A non-success HTTP status, with whatever structured body came with it.
#[derive(Debug, Clone, Error)]
#[error("API Error: {status} {status_text}")]
pub struct ApiError {
    pub status: u16,
    pub status_text: String,
    /// Decoded error body, or `Value::Null` when it was empty or not JSON.
    pub data: Value,
}

impl ApiError {
    /// Decode `data` into a typed error payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Failure reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport: {0}")]
    Other(BoxError),
}

impl TransportError {
    pub fn new(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        TransportError::Other(Box::new(e))
    }
}

/// Everything a fetcher call can fail with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request body could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("interceptor: {0}")]
    Interceptor(BoxError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("response body could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// Wrap an arbitrary failure raised inside an interceptor.
    pub fn interceptor(e: impl Into<BoxError>) -> Self {
        FetchError::Interceptor(e.into())
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            FetchError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of an `ApiError`.
    pub fn status(&self) -> Option<u16> {
        self.as_api().map(|e| e.status)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Transport(TransportError::Cancelled))
    }
}
