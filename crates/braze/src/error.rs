//! Error types for the Braze framework layer.
//!
//! Foundation errors ([`StoreError`]) are defined in `braze-core`; this
//! module adds the dispatch-level taxonomy. A failing handler aborts the
//! in-progress chain and its error reaches the caller untouched as the
//! `source` of [`DispatchError::Handler`]: no retry, no synthesized
//! payload.

use braze_core::StoreError;
use thiserror::Error;

/// A type-erased error produced by a middleware or route handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can abort a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A middleware or route handler failed. The original error is kept
    /// unmodified as the source.
    #[error("handler failed while dispatching '{action}'")]
    Handler {
        /// The action (or rendered path) being dispatched.
        action: String,
        /// The handler's error, exactly as produced.
        #[source]
        source: BoxError,
    },

    /// Loading or persisting the metadata document failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub(crate) fn handler(action: &str, source: BoxError) -> Self {
        Self::Handler {
            action: action.to_string(),
            source,
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
