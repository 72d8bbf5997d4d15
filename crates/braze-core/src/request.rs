//! The inbound hook request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One inbound request to an integration.
///
/// Mirrors the hook wire payload (`action`, `projectId`, `clientState`).
/// The `action` selects middleware and routes; `client_state` carries the
/// request-scoped client values (form inputs and the like) read through
/// the dispatch context's `get` accessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest {
    /// The action identifier, analogous to a request path.
    pub action: String,

    /// The project the request is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Request-scoped client state.
    #[serde(default)]
    pub client_state: HashMap<String, String>,
}

impl HookRequest {
    /// Creates a request for `action` with no project and no client state.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Scopes the request to a project.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Adds a client-state entry.
    pub fn with_client_state(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.client_state.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_wire_shape() {
        let request: HookRequest = serde_json::from_str(
            r#"{"action": "setToken", "projectId": "prj_1", "clientState": {"token": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(request.action, "setToken");
        assert_eq!(request.project_id.as_deref(), Some("prj_1"));
        assert_eq!(request.client_state.get("token").map(String::as_str), Some("abc"));
    }

    #[test]
    fn missing_fields_default() {
        let request: HookRequest = serde_json::from_str(r#"{"action": "view"}"#).unwrap();
        assert!(request.project_id.is_none());
        assert!(request.client_state.is_empty());
    }
}
