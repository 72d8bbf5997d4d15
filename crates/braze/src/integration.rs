//! The integration entry point: registration surface and dispatcher.
//!
//! An [`Integration`] is composed once at startup (middleware via
//! [`middleware`]/[`middleware_on`], routes via [`render`], plugins via
//! [`extend`]) and then dispatches any number of requests through
//! [`dispatch`]. Registration order is permanent and defines match
//! precedence for both middleware and routes; `dispatch` takes `&self`,
//! so the tables cannot change mid-dispatch.
//!
//! # Dispatch flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌────────────┐
//! │ HookRequest │────▶│ middleware chain │────▶│ RouteTable │──▶ R
//! └─────────────┘     │  (halt ──▶ R)    │     │ (+default) │
//!                     └─────────────────┘     └────────────┘
//! ```
//!
//! 1. Load the store through the injected backend.
//! 2. Create `store[project_id]` if the request names an absent project.
//! 3. Build the [`DispatchContext`].
//! 4. Run middleware entries in registration order; gated entries whose
//!    patterns miss the action are skipped without side effects; a
//!    [`Flow::Halt`] short-circuits with its payload; a handler error
//!    aborts the dispatch.
//! 5. An exhausted chain triggers exactly one route-table resolution.
//!
//! Handlers run strictly sequentially; there is no fan-out, no timeout
//! and no cancellation.
//!
//! [`middleware`]: Integration::middleware
//! [`middleware_on`]: Integration::middleware_on
//! [`render`]: Integration::render
//! [`extend`]: Integration::extend
//! [`dispatch`]: Integration::dispatch

use std::sync::Arc;

use tracing::{Instrument, Level, debug, span, trace};

use braze_core::{HookRequest, IntoPatterns, MetadataStore, match_first};

use crate::context::DispatchContext;
use crate::error::{BoxError, DispatchError, DispatchResult};
use crate::middleware::{Flow, MiddlewareEntry, into_middleware};
use crate::plugin::Plugin;
use crate::routes::{RouteTable, into_route};

/// An action-dispatch application.
///
/// `R` is the opaque response payload produced by handlers; the engine
/// passes it through unexamined.
pub struct Integration<R> {
    middlewares: Vec<MiddlewareEntry<R>>,
    routes: Arc<RouteTable<R>>,
}

impl<R: Send + 'static> Integration<R> {
    /// Creates an integration with the mandatory default route.
    ///
    /// The default route handles every path no registered route matches.
    /// Requiring it here makes a table without one unrepresentable.
    pub fn new<F, Fut>(default_route: F) -> Self
    where
        F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self {
            middlewares: Vec::new(),
            routes: Arc::new(RouteTable::new(into_route(default_route))),
        }
    }

    /// Registers an unconditional middleware entry.
    ///
    /// The handler runs on every dispatch, regardless of action.
    pub fn middleware<F, Fut>(&mut self, handler: F)
    where
        F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<R>, BoxError>> + Send + 'static,
    {
        self.middlewares.push(MiddlewareEntry {
            patterns: None,
            handler: into_middleware(handler),
        });
    }

    /// Registers a pattern-gated middleware entry.
    ///
    /// The handler runs iff at least one pattern matches the action; the
    /// first matching pattern's parameters are injected into the context.
    pub fn middleware_on<P, F, Fut>(&mut self, patterns: P, handler: F)
    where
        P: IntoPatterns,
        F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<R>, BoxError>> + Send + 'static,
    {
        self.middlewares.push(MiddlewareEntry {
            patterns: Some(patterns.into_patterns()),
            handler: into_middleware(handler),
        });
    }

    /// Registers a route.
    ///
    /// # Panics
    ///
    /// Panics when `patterns` yields an empty list; a route without a
    /// pattern is a composition-time misconfiguration.
    pub fn render<P, F, Fut>(&mut self, patterns: P, handler: F)
    where
        P: IntoPatterns,
        F: Fn(DispatchContext<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Arc::make_mut(&mut self.routes).register(patterns.into_patterns(), into_route(handler));
    }

    /// Applies a reusable bundle of registrations against this surface.
    ///
    /// Plugins are composition-time only; applying one after dispatching
    /// has begun is unsupported.
    pub fn extend<P: Plugin<R>>(&mut self, plugin: P) {
        plugin.install(self);
    }

    /// Returns the number of registered middleware entries.
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable<R> {
        &self.routes
    }

    /// Dispatches one inbound request.
    ///
    /// Returns the payload of whichever handler terminated the dispatch
    /// (a halting middleware, a matched route, or the default route), or
    /// the first handler/store failure.
    pub async fn dispatch(
        &self,
        request: HookRequest,
        backend: Arc<dyn MetadataStore>,
    ) -> DispatchResult<R> {
        let span = span!(Level::DEBUG, "dispatch", action = %request.action);
        self.run(request, backend).instrument(span).await
    }

    async fn run(
        &self,
        request: HookRequest,
        backend: Arc<dyn MetadataStore>,
    ) -> DispatchResult<R> {
        let mut store = backend.load().await?;
        if let Some(id) = request.project_id.as_deref() {
            store.ensure_scope(id);
        }

        let action = request.action.clone();
        let ctx = DispatchContext::new(request, store, backend, Arc::clone(&self.routes));

        for (index, entry) in self.middlewares.iter().enumerate() {
            let scoped = match &entry.patterns {
                Some(patterns) => match match_first(patterns, &action) {
                    Some(params) => ctx.with_params(params),
                    None => {
                        trace!(middleware = index, "no pattern matched, skipping");
                        continue;
                    }
                },
                None => ctx.clone(),
            };

            match (entry.handler)(scoped).await {
                Ok(Flow::Continue) => trace!(middleware = index, "continuing"),
                Ok(Flow::Halt(value)) => {
                    debug!(middleware = index, "middleware halted dispatch");
                    return Ok(value);
                }
                Err(source) => {
                    debug!(middleware = index, error = %source, "middleware failed, aborting");
                    return Err(DispatchError::handler(&action, source));
                }
            }
        }

        debug!("middleware chain exhausted, resolving route");
        self.routes.resolve(&action, ctx).await
    }
}

impl<R> std::fmt::Debug for Integration<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("middleware_count", &self.middlewares.len())
            .field("routes", &self.routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use tokio_test::assert_ok;

    use braze_core::{MemoryStore, Store};

    fn app() -> Integration<String> {
        Integration::new(|_ctx| async move { Ok("default".to_string()) })
    }

    fn backend() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn route_receives_extracted_params() {
        let mut app = app();
        app.render("a/:id", |ctx: DispatchContext<String>| async move {
            Ok(format!("id={}", ctx.param("id").unwrap_or("?")))
        });

        let result = app.dispatch(HookRequest::new("a/5"), backend()).await;
        assert_eq!(assert_ok!(result), "id=5");
    }

    #[tokio::test]
    async fn first_registered_route_wins_over_more_specific() {
        let mut app = app();
        app.render("a", |_ctx| async move { Ok("prefix".to_string()) });
        app.render("a/:id", |_ctx| async move { Ok("specific".to_string()) });

        let result = app.dispatch(HookRequest::new("a/5"), backend()).await.unwrap();
        assert_eq!(result, "prefix");
    }

    #[tokio::test]
    async fn unmatched_action_falls_back_to_default_route() {
        let mut app = app();
        app.render("known", |_ctx| async move { Ok("known".to_string()) });

        let result = app.dispatch(HookRequest::new("other"), backend()).await.unwrap();
        assert_eq!(result, "default");
    }

    #[tokio::test]
    async fn default_route_sees_no_params() {
        let app = Integration::new(|ctx: DispatchContext<String>| async move {
            assert!(ctx.params().is_none());
            Ok("default".to_string())
        });

        let result = app.dispatch(HookRequest::new("x/y"), backend()).await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn gated_middleware_is_skipped_without_side_effects() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);

        let mut app = app();
        app.middleware_on("setToken", move |_ctx| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }
        });

        let result = app.dispatch(HookRequest::new("other"), backend()).await.unwrap();
        assert_eq!(result, "default");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconditional_middleware_runs_on_every_action() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);

        let mut app = app();
        app.middleware(move |_ctx| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }
        });

        for action in ["a", "b/c", "setToken"] {
            app.dispatch(HookRequest::new(action), backend()).await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn halt_short_circuits_chain_and_routes() {
        let later = Arc::new(AtomicUsize::new(0));
        let l1 = Arc::clone(&later);
        let l2 = Arc::clone(&later);

        let mut app = Integration::new(move |_ctx| {
            let l = Arc::clone(&l2);
            async move {
                l.fetch_add(100, Ordering::SeqCst);
                Ok("default".to_string())
            }
        });
        app.middleware(|_ctx| async move { Ok(Flow::Halt("X".to_string())) });
        app.middleware(move |_ctx| {
            let l = Arc::clone(&l1);
            async move {
                l.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }
        });

        let result = app.dispatch(HookRequest::new("anything"), backend()).await.unwrap();
        assert_eq!(result, "X");
        // Neither the later middleware nor any route resolution ran.
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_resolves_routes_exactly_once() {
        let resolutions = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&resolutions);

        let mut app = app();
        app.middleware(|_ctx| async move { Ok(Flow::Continue) });
        app.middleware(|_ctx| async move { Ok(Flow::Continue) });
        app.render("ping", move |_ctx| {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok("pong".to_string())
            }
        });

        let result = app.dispatch(HookRequest::new("ping"), backend()).await.unwrap();
        assert_eq!(result, "pong");
        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn middleware_receives_params_from_first_matching_pattern() {
        let mut app = app();
        app.middleware_on(
            vec!["items/:id", "items/:other"],
            |ctx: DispatchContext<String>| async move {
                assert_eq!(ctx.param("id"), Some("7"));
                assert_eq!(ctx.param("other"), None);
                Ok(Flow::Halt("seen".to_string()))
            },
        );

        let result = app.dispatch(HookRequest::new("items/7"), backend()).await.unwrap();
        assert_eq!(result, "seen");
    }

    #[tokio::test]
    async fn handler_error_aborts_and_propagates_unmodified() {
        let reached = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&reached);

        let mut app = app();
        app.middleware(|_ctx| async move { Err("boom".into()) });
        app.middleware(move |_ctx| {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }
        });

        let err = app
            .dispatch(HookRequest::new("any"), backend())
            .await
            .unwrap_err();
        match err {
            DispatchError::Handler { action, source } => {
                assert_eq!(action, "any");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn project_scope_exists_before_first_handler() {
        let mut app = app();
        app.middleware(|ctx: DispatchContext<String>| async move {
            assert!(ctx.store().contains("p1"));
            let mut scope = ctx.project_store().expect("project scope");
            scope.insert("seen".into(), json!("yes"));
            Ok(Flow::Continue)
        });
        app.middleware(|ctx: DispatchContext<String>| async move {
            // The earlier write is visible through the shared document.
            let value = {
                let store = ctx.store();
                store
                    .scope("p1")
                    .and_then(|scope| scope.get("seen"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            assert_eq!(value.as_deref(), Some("yes"));
            Ok(Flow::Continue)
        });

        let request = HookRequest::new("view").with_project("p1");
        let result = app.dispatch(request, backend()).await.unwrap();
        assert_eq!(result, "default");
    }

    #[tokio::test]
    async fn save_store_overwrites_backend_document() {
        let backend = Arc::new(MemoryStore::with_document({
            let mut seeded = Store::new();
            seeded.set("stale", true);
            seeded
        }));

        let mut app = app();
        app.middleware(|ctx: DispatchContext<String>| async move {
            ctx.store().remove("stale");
            ctx.store().set("fresh", 1);
            ctx.save_store().await?;
            Ok(Flow::Continue)
        });

        app.dispatch(HookRequest::new("view"), Arc::clone(&backend) as Arc<dyn MetadataStore>)
            .await
            .unwrap();

        let persisted = backend.snapshot();
        assert!(!persisted.contains("stale"));
        assert_eq!(persisted.get("fresh"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn store_is_not_persisted_without_save() {
        let backend = backend();

        let mut app = app();
        app.middleware(|ctx: DispatchContext<String>| async move {
            ctx.store().set("volatile", true);
            Ok(Flow::Continue)
        });

        app.dispatch(HookRequest::new("view"), Arc::clone(&backend) as Arc<dyn MetadataStore>)
            .await
            .unwrap();
        assert!(backend.snapshot().is_empty());
    }

    #[tokio::test]
    async fn render_route_does_not_carry_caller_params() {
        let mut app = app();
        app.render("detail", |ctx: DispatchContext<String>| async move {
            assert!(ctx.params().is_none());
            Ok("detail".to_string())
        });
        app.middleware_on("items/:id", |ctx: DispatchContext<String>| async move {
            assert_eq!(ctx.param("id"), Some("3"));
            let rendered = ctx.render_route("detail").await?;
            Ok(Flow::Halt(rendered))
        });

        let result = app.dispatch(HookRequest::new("items/3"), backend()).await.unwrap();
        assert_eq!(result, "detail");
    }

    #[tokio::test]
    async fn render_route_sees_current_store_contents() {
        let mut app = app();
        app.render("whoami", |ctx: DispatchContext<String>| async move {
            let name = { ctx.store().get_str("name").unwrap_or("nobody").to_string() };
            Ok(name)
        });
        app.middleware(|ctx: DispatchContext<String>| async move {
            ctx.store().set("name", "ada");
            let rendered = ctx.render_route("whoami").await?;
            Ok(Flow::Halt(rendered))
        });

        let result = app.dispatch(HookRequest::new("any"), backend()).await.unwrap();
        assert_eq!(result, "ada");
    }

    #[tokio::test]
    async fn client_state_is_readable_through_get() {
        let mut app = app();
        app.middleware(|ctx: DispatchContext<String>| async move {
            Ok(Flow::Halt(ctx.get("token").unwrap_or("none").to_string()))
        });

        let request = HookRequest::new("setToken").with_client_state("token", "abc");
        let result = app.dispatch(request, backend()).await.unwrap();
        assert_eq!(result, "abc");
    }

    #[tokio::test]
    async fn extend_applies_closure_plugins() {
        let mut app = app();
        app.extend(|app: &mut Integration<String>| {
            app.render("plugged", |_ctx| async move { Ok("plugged".to_string()) });
        });

        let result = app.dispatch(HookRequest::new("plugged"), backend()).await.unwrap();
        assert_eq!(result, "plugged");
    }

    #[tokio::test]
    async fn matching_is_case_insensitive_end_to_end() {
        let mut app = app();
        app.render("Items/:id", |ctx: DispatchContext<String>| async move {
            Ok(ctx.param("id").unwrap_or("?").to_string())
        });

        let result = app.dispatch(HookRequest::new("items/Abc"), backend()).await.unwrap();
        assert_eq!(result, "Abc");
    }
}
