//! Request and response interceptors.
//!
//! An interceptor receives the current value and returns its replacement.
//! Interceptors run one at a time, in registration order, each awaited
//! before the next starts.
//!
//! Any async closure with the right signature is an interceptor:
//!
//! ```
//! use fetcher_core::{FetchError, InterceptorContext};
//!
//! let add_trace_id = |mut ctx: InterceptorContext| async move {
//!     ctx.init.headers.insert("X-Trace-Id", "abc");
//!     Ok::<_, FetchError>(ctx)
//! };
//! # let _ = add_trace_id;
//! ```
//!
//! Synchronous, infallible closures go through [`sync`].

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::http::Response;
use crate::options::InterceptorContext;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait RequestInterceptor: Send + Sync + 'static {
    fn intercept(&self, ctx: InterceptorContext) -> BoxFuture<'_, Result<InterceptorContext, FetchError>>;
}

pub trait ResponseInterceptor: Send + Sync + 'static {
    fn intercept(&self, response: Response) -> BoxFuture<'_, Result<Response, FetchError>>;
}

impl<F, Fut> RequestInterceptor for F
where
    F: Fn(InterceptorContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<InterceptorContext, FetchError>> + Send + 'static,
{
    fn intercept(&self, ctx: InterceptorContext) -> BoxFuture<'_, Result<InterceptorContext, FetchError>> {
        Box::pin(self(ctx))
    }
}

impl<F, Fut> ResponseInterceptor for F
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, FetchError>> + Send + 'static,
{
    fn intercept(&self, response: Response) -> BoxFuture<'_, Result<Response, FetchError>> {
        Box::pin(self(response))
    }
}

/// Interceptor built from a synchronous closure. See [`sync`].
#[derive(Debug, Clone, Copy)]
pub struct SyncFn<F>(F);

/// Adapts a plain `Fn(T) -> T` closure into a request or response
/// interceptor.
pub fn sync<F>(f: F) -> SyncFn<F> {
    SyncFn(f)
}

impl<F> RequestInterceptor for SyncFn<F>
where
    F: Fn(InterceptorContext) -> InterceptorContext + Send + Sync + 'static,
{
    fn intercept(&self, ctx: InterceptorContext) -> BoxFuture<'_, Result<InterceptorContext, FetchError>> {
        let next = (self.0)(ctx);
        Box::pin(std::future::ready(Ok(next)))
    }
}

impl<F> ResponseInterceptor for SyncFn<F>
where
    F: Fn(Response) -> Response + Send + Sync + 'static,
{
    fn intercept(&self, response: Response) -> BoxFuture<'_, Result<Response, FetchError>> {
        let next = (self.0)(response);
        Box::pin(std::future::ready(Ok(next)))
    }
}
