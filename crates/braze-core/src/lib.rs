//! # Braze Core
//!
//! Foundation types for the Braze integration framework.
//!
//! This crate provides the building blocks that the framework layer
//! (`braze`) composes into a dispatch pipeline:
//!
//! - **Pattern Matching**: path-like action patterns with named parameter
//!   extraction ([`Pattern`], [`Params`])
//! - **Metadata Store**: the persisted key-value document shared by every
//!   handler in a dispatch ([`Store`]), plus the injected persistence
//!   capability ([`MetadataStore`])
//! - **Requests**: the inbound hook payload ([`HookRequest`])
//!
//! Nothing in this crate knows about middleware or routes; it only defines
//! the data these operate on.

pub mod pattern;
pub mod request;
pub mod store;

pub use pattern::{IntoPatterns, Params, Pattern, match_first};
pub use request::HookRequest;
pub use store::{MemoryStore, MetadataStore, Store, StoreError, StoreResult};
