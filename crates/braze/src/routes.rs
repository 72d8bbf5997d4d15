//! Pattern-matched route table with a mandatory default route.
//!
//! Routes are consulted only after the middleware chain is exhausted (or
//! explicitly, through [`DispatchContext::render_route`]). Resolution is
//! strictly first-registration-order: the first entry with any matching
//! pattern wins, even when a later entry's pattern is more specific. A
//! path no entry matches falls back to the default route, never an error.
//!
//! The default route is supplied at construction; a table without one is
//! unrepresentable.
//!
//! [`DispatchContext::render_route`]: crate::context::DispatchContext::render_route

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, trace};

use braze_core::{Pattern, match_first};

use crate::context::DispatchContext;
use crate::error::{BoxError, DispatchError, DispatchResult};

/// The boxed future returned by a type-erased route handler.
pub type RouteFuture<R> = BoxFuture<'static, Result<R, BoxError>>;

/// A type-erased route handler.
pub type BoxedRoute<R> = Arc<dyn Fn(DispatchContext<R>) -> RouteFuture<R> + Send + Sync>;

/// Converts a route function into a boxed handler.
pub fn into_route<F, Fut, R>(f: F) -> BoxedRoute<R>
where
    F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    R: Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

struct RouteEntry<R> {
    patterns: Vec<Pattern>,
    handler: BoxedRoute<R>,
}

impl<R> Clone for RouteEntry<R> {
    fn clone(&self) -> Self {
        Self {
            patterns: self.patterns.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// The ordered route table.
///
/// Populated during application composition and treated as immutable once
/// dispatching begins.
pub struct RouteTable<R> {
    routes: Vec<RouteEntry<R>>,
    default: BoxedRoute<R>,
}

impl<R> Clone for RouteTable<R> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            default: Arc::clone(&self.default),
        }
    }
}

impl<R: Send + 'static> RouteTable<R> {
    /// Creates a table with only the default route.
    pub(crate) fn new(default: BoxedRoute<R>) -> Self {
        Self {
            routes: Vec::new(),
            default,
        }
    }

    /// Appends a route entry. Patterns must be non-empty.
    pub(crate) fn register(&mut self, patterns: Vec<Pattern>, handler: BoxedRoute<R>) {
        assert!(
            !patterns.is_empty(),
            "a route requires at least one pattern"
        );
        self.routes.push(RouteEntry { patterns, handler });
    }

    /// Returns the number of registered routes, excluding the default.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when only the default route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves `path` to a handler and invokes it.
    ///
    /// The first registered entry with a matching pattern wins; parameters
    /// come from the first matching pattern *within* that entry. With no
    /// match, the default route runs with the context unmodified (no
    /// parameters injected).
    pub(crate) async fn resolve(&self, path: &str, ctx: DispatchContext<R>) -> DispatchResult<R> {
        for (index, entry) in self.routes.iter().enumerate() {
            let Some(params) = match_first(&entry.patterns, path) else {
                trace!(route = index, path, "route did not match");
                continue;
            };

            debug!(route = index, path, "route matched");
            return (entry.handler)(ctx.with_params(params))
                .await
                .map_err(|source| DispatchError::handler(path, source));
        }

        debug!(path, "no route matched, falling back to default route");
        (self.default)(ctx)
            .await
            .map_err(|source| DispatchError::handler(path, source))
    }
}

impl<R> std::fmt::Debug for RouteTable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("route_count", &self.routes.len())
            .finish()
    }
}
