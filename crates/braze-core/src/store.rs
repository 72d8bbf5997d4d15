//! The persisted metadata document and its persistence capability.
//!
//! A [`Store`] is the key-value document an integration keeps between
//! dispatches. Within one dispatch a single `Store` is shared by reference
//! with every handler; it only survives the dispatch when a handler
//! explicitly calls the save hook; there is no auto-save on mutation.
//!
//! Per-project state lives in sub-objects keyed by project id
//! ("scopes"): `{"prj_123": {"token": "..."}, "theme": "dark"}`.
//!
//! Persistence is injected through the [`MetadataStore`] trait; saving
//! always overwrites the **entire** document, never a delta. If the host
//! can run two dispatches against the same document concurrently, the last
//! save wins with no merge; callers needing isolation must provide it
//! externally.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while loading or persisting a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Loading the document from the backend failed.
    #[error("failed to load metadata: {0}")]
    Load(String),

    /// Persisting the document to the backend failed.
    #[error("failed to save metadata: {0}")]
    Save(String),

    /// The document could not be serialized or deserialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The metadata document: a JSON object with per-project sub-objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: Map<String, Value>,
}

impl Store {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    pub fn from_document(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Returns a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns a top-level value as a string slice, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Sets a top-level value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes a top-level value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns `true` if a top-level key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` if the document holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates the scope sub-object for `id` if it is absent.
    ///
    /// Called once per dispatch, before the middleware chain runs, whenever
    /// the request carries a project id. An existing value at `id` is left
    /// untouched here; see [`scope_mut`](Self::scope_mut) for coercion.
    pub fn ensure_scope(&mut self, id: &str) {
        if !self.entries.contains_key(id) {
            self.entries.insert(id.to_string(), Value::Object(Map::new()));
        }
    }

    /// Returns the scope sub-object for `id`, if present and an object.
    pub fn scope(&self, id: &str) -> Option<&Map<String, Value>> {
        self.entries.get(id).and_then(Value::as_object)
    }

    /// Returns the scope sub-object for `id`, creating it if needed.
    ///
    /// A non-object value already stored under `id` is replaced by an
    /// empty object; scoped and unscoped data must not share a key.
    pub fn scope_mut(&mut self, id: &str) -> &mut Map<String, Value> {
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut().unwrap()
    }

    /// Returns the underlying JSON object.
    pub fn as_document(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Consumes the store, returning the underlying JSON object.
    pub fn into_document(self) -> Map<String, Value> {
        self.entries
    }
}

// ============================================================================
// MetadataStore - the injected persistence capability
// ============================================================================

/// The persistence capability injected into each dispatch.
///
/// [`save`](Self::save) overwrites the whole document; implementations
/// must not attempt incremental merging.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Loads the current document. A backend with no stored document
    /// returns an empty [`Store`].
    async fn load(&self) -> StoreResult<Store>;

    /// Persists the document, replacing whatever was stored before.
    async fn save(&self, store: &Store) -> StoreResult<()>;
}

/// An in-memory [`MetadataStore`].
///
/// The simplest possible backend; used throughout the test suite and
/// suitable for single-process hosts that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Store>,
}

impl MemoryStore {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-seeded with a document.
    pub fn with_document(store: Store) -> Self {
        Self {
            document: Mutex::new(store),
        }
    }

    /// Returns a snapshot of the currently persisted document.
    pub fn snapshot(&self) -> Store {
        self.document.lock().clone()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn load(&self) -> StoreResult<Store> {
        Ok(self.document.lock().clone())
    }

    async fn save(&self, store: &Store) -> StoreResult<()> {
        *self.document.lock() = store.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_scope_creates_empty_object_once() {
        let mut store = Store::new();
        store.ensure_scope("prj_1");
        assert_eq!(store.get("prj_1"), Some(&json!({})));

        store.scope_mut("prj_1").insert("token".into(), json!("t"));
        store.ensure_scope("prj_1");
        assert_eq!(store.get("prj_1"), Some(&json!({"token": "t"})));
    }

    #[test]
    fn scope_mut_replaces_non_object_values() {
        let mut store = Store::new();
        store.set("prj_1", "not an object");
        assert!(store.scope_mut("prj_1").is_empty());
        assert_eq!(store.get("prj_1"), Some(&json!({})));
    }

    #[test]
    fn top_level_accessors() {
        let mut store = Store::new();
        store.set("theme", "dark");
        assert_eq!(store.get_str("theme"), Some("dark"));
        assert!(store.contains("theme"));
        assert_eq!(store.remove("theme"), Some(json!("dark")));
        assert!(store.is_empty());
    }

    #[test]
    fn serde_shape_is_transparent() {
        let store: Store = serde_json::from_value(json!({
            "prj_1": {"token": "t"},
            "global": "x",
        }))
        .unwrap();
        assert_eq!(store.get_str("global"), Some("x"));
        assert_eq!(
            store.scope("prj_1").and_then(|s| s.get("token")),
            Some(&json!("t"))
        );
        assert_eq!(
            serde_json::to_value(&store).unwrap(),
            json!({"prj_1": {"token": "t"}, "global": "x"})
        );
    }

    #[tokio::test]
    async fn memory_store_save_overwrites_the_whole_document() {
        let backend = MemoryStore::new();

        let mut first = Store::new();
        first.set("a", 1);
        first.set("b", 2);
        backend.save(&first).await.unwrap();

        let mut second = Store::new();
        second.set("a", 3);
        backend.save(&second).await.unwrap();

        let loaded = backend.load().await.unwrap();
        assert_eq!(loaded, second);
        assert!(!loaded.contains("b"));
    }
}
