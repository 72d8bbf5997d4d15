//! Middleware flow control and handler erasure.
//!
//! A middleware handler is an async function from a [`DispatchContext`] to
//! a [`Flow`] decision: either hand control to the next entry
//! ([`Flow::Continue`]) or terminate the dispatch with a payload
//! ([`Flow::Halt`]). The decision is the handler's return value, so exactly
//! one outcome exists per invocation. There is no separate continuation
//! callback that could race against the returned value, and a handler
//! cannot signal both.
//!
//! A handler whose future never completes stalls the dispatch; the engine
//! applies no timeout. This is a documented limitation, not a guarded
//! condition.
//!
//! # Example
//!
//! ```rust,ignore
//! app.middleware_on("setToken", |ctx: DispatchContext<String>| async move {
//!     if ctx.get("token").is_none() {
//!         return Ok(Flow::Halt("<Page>Token required</Page>".to_string()));
//!     }
//!     Ok(Flow::Continue)
//! });
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;

use braze_core::Pattern;

use crate::context::DispatchContext;
use crate::error::BoxError;

/// The outcome of one middleware invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<R> {
    /// Proceed to the next middleware entry, or to route resolution once
    /// the chain is exhausted.
    Continue,
    /// Stop the chain; the payload becomes the dispatch result. No further
    /// middleware runs and the route table is never consulted.
    Halt(R),
}

impl<R> Flow<R> {
    /// Returns `true` for [`Flow::Halt`].
    pub fn is_halt(&self) -> bool {
        matches!(self, Flow::Halt(_))
    }
}

/// The boxed future returned by a type-erased middleware handler.
pub type MiddlewareFuture<R> = BoxFuture<'static, Result<Flow<R>, BoxError>>;

/// A type-erased middleware handler stored in the chain.
///
/// Internally a closure that captures the original handler and invokes it
/// with the per-entry context on each dispatch.
pub type BoxedMiddleware<R> =
    Arc<dyn Fn(DispatchContext<R>) -> MiddlewareFuture<R> + Send + Sync>;

/// Converts a middleware function into a boxed handler.
pub fn into_middleware<F, Fut, R>(f: F) -> BoxedMiddleware<R>
where
    F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow<R>, BoxError>> + Send + 'static,
    R: Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// One registered middleware entry.
///
/// `patterns: None` means the entry runs unconditionally on every dispatch;
/// with patterns, the handler runs iff at least one pattern matches the
/// action, and the first matching pattern's parameters are injected.
pub(crate) struct MiddlewareEntry<R> {
    pub(crate) patterns: Option<Vec<Pattern>>,
    pub(crate) handler: BoxedMiddleware<R>,
}
