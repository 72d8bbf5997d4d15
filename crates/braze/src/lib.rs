//! # Braze
//!
//! An action-dispatch framework for building integration UI hooks.
//!
//! An integration receives opaque "action" requests (analogous to request
//! paths), threads them through an ordered chain of pattern-gated
//! middleware, and resolves whatever the chain did not terminate against
//! a pattern-matched route table with a mandatory default route.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ HookRequest │────▶│ middleware chain │────▶│  RouteTable  │──▶ result
//! │  (+ store)  │     │  continue / halt │     │  (+ default) │
//! └─────────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! - **[`Integration`]**: the registration surface and dispatcher
//! - **[`DispatchContext`]**: the per-request bundle of store, client
//!   state and extracted parameters shared by every handler
//! - **[`Flow`]**: a middleware's continue-or-halt decision
//! - **[`plugin`]**: reusable registration bundles, including the built-in
//!   project-selection and token-login gates
//!
//! Foundation types (patterns, the metadata store, the request payload)
//! live in `braze-core` and are re-exported here.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use braze::prelude::*;
//!
//! let mut app: Integration<String> = Integration::new(|_ctx| async move {
//!     Ok("<Page>Dashboard</Page>".to_string())
//! });
//!
//! app.extend(RequireProject::new());
//! app.extend(RequireTokenLogin::new());
//!
//! app.render("items/:id", |ctx: DispatchContext<String>| async move {
//!     Ok(format!("<Page>Item {}</Page>", ctx.param("id").unwrap_or("?")))
//! });
//!
//! let backend = Arc::new(MemoryStore::new());
//! let result = app.dispatch(HookRequest::new("items/5"), backend).await?;
//! ```

pub mod context;
pub mod error;
pub mod integration;
pub mod middleware;
pub mod plugin;
pub mod routes;

pub use braze_core as core;

pub use context::DispatchContext;
pub use error::{BoxError, DispatchError, DispatchResult};
pub use integration::Integration;
pub use middleware::{BoxedMiddleware, Flow, MiddlewareFuture, into_middleware};
pub use plugin::Plugin;
pub use routes::{BoxedRoute, RouteFuture, RouteTable, into_route};

pub use braze_core::{
    HookRequest, IntoPatterns, MemoryStore, MetadataStore, Params, Pattern, Store, StoreError,
    StoreResult, match_first,
};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use braze::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::DispatchContext;
    pub use crate::error::{BoxError, DispatchError, DispatchResult};
    pub use crate::integration::Integration;
    pub use crate::middleware::Flow;
    pub use crate::plugin::Plugin;
    pub use crate::plugin::builtin::{RequireProject, RequireTokenLogin};

    pub use braze_core::{
        HookRequest, IntoPatterns, MemoryStore, MetadataStore, Params, Pattern, Store,
    };
}
