//! The per-dispatch context handed to every handler.
//!
//! One [`DispatchContext`] is built per inbound request and shared with
//! every middleware and route handler invoked during that dispatch. It is
//! a cheap handle: all dispatch-wide state (action, client state, the
//! metadata store, the persistence backend, the route table) lives behind
//! an `Arc`, while the `params` slot is per-invocation: each
//! pattern-gated handler receives its own clone carrying the parameters
//! its pattern extracted.
//!
//! # Store sharing
//!
//! [`store`](DispatchContext::store) and
//! [`project_store`](DispatchContext::project_store) view one mutable
//! document: a write made by any handler is visible to every later handler
//! in the same dispatch. The document is persisted only by an explicit
//! [`save_store`](DispatchContext::save_store) call, which overwrites the
//! backend's copy wholesale.
//!
//! Store guards are `parking_lot` mutex guards and must be dropped before
//! awaiting; holding one across an await point does not compile in a
//! `Send` handler future.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde_json::{Map, Value};

use braze_core::{HookRequest, MetadataStore, Params, Store, StoreResult};

use crate::error::DispatchResult;
use crate::routes::RouteTable;

struct Shared<R> {
    action: String,
    project_id: Option<String>,
    client_state: HashMap<String, String>,
    store: Mutex<Store>,
    backend: Arc<dyn MetadataStore>,
    routes: Arc<RouteTable<R>>,
}

/// The context passed to middleware and route handlers.
pub struct DispatchContext<R> {
    shared: Arc<Shared<R>>,
    params: Option<Arc<Params>>,
}

impl<R> Clone for DispatchContext<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            params: self.params.clone(),
        }
    }
}

impl<R: Send + 'static> DispatchContext<R> {
    pub(crate) fn new(
        request: HookRequest,
        store: Store,
        backend: Arc<dyn MetadataStore>,
        routes: Arc<RouteTable<R>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                action: request.action,
                project_id: request.project_id,
                client_state: request.client_state,
                store: Mutex::new(store),
                backend,
                routes,
            }),
            params: None,
        }
    }

    /// The action being dispatched.
    pub fn action(&self) -> &str {
        &self.shared.action
    }

    /// The project the request is scoped to, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.shared.project_id.as_deref()
    }

    /// Parameters extracted by the pattern that admitted this handler.
    ///
    /// `None` for unconditional middleware and for the default route.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_deref()
    }

    /// Looks up a single extracted parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_deref()?.get(name).map(String::as_str)
    }

    /// Reads a request-scoped client-state value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.shared.client_state.get(key).map(String::as_str)
    }

    /// Locks and returns the dispatch-shared metadata store.
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.shared.store.lock()
    }

    /// Locks the store and returns the project's scope sub-object.
    ///
    /// `None` when the request carries no project id. When it does, the
    /// dispatcher created the scope before the chain ran, so the guard
    /// aliases `store[project_id]` directly; mutations through it are
    /// mutations of the shared document.
    pub fn project_store(&self) -> Option<MappedMutexGuard<'_, Map<String, Value>>> {
        let id = self.shared.project_id.as_deref()?;
        Some(MutexGuard::map(self.shared.store.lock(), |store| {
            store.scope_mut(id)
        }))
    }

    /// Persists the entire store document through the injected backend.
    ///
    /// Snapshot-then-save: the lock is released before the backend call,
    /// so handlers may hold no guard while this awaits.
    pub async fn save_store(&self) -> StoreResult<()> {
        let snapshot = self.shared.store.lock().clone();
        self.shared.backend.save(&snapshot).await
    }

    /// Resolves `path` against the route table, as if the middleware chain
    /// had been exhausted with that path as the action.
    ///
    /// The resolution sees the current store contents (shared reference),
    /// but *not* the calling handler's `params`; route-pattern parameters
    /// are injected by resolution itself, nothing else carries over.
    pub async fn render_route(&self, path: &str) -> DispatchResult<R> {
        let routes = Arc::clone(&self.shared.routes);
        routes.resolve(path, self.without_params()).await
    }

    /// Derives the per-entry context for a pattern-matched handler.
    pub(crate) fn with_params(&self, params: Params) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            params: Some(Arc::new(params)),
        }
    }

    /// Derives a context with the `params` slot cleared.
    pub(crate) fn without_params(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            params: None,
        }
    }
}

impl<R> std::fmt::Debug for DispatchContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("action", &self.shared.action)
            .field("project_id", &self.shared.project_id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
