//! Token-based login gating.
//!
//! [`RequireTokenLogin`] keeps every dispatch behind a credential wall
//! built from three middlewares, installed in this order:
//!
//! 1. gated on `setToken`: collects the configured token values from
//!    client state, validates them, stores them, saves the store and
//!    continues; any missing value or validator rejection halts with the
//!    login view and an error message.
//! 2. gated on `logout`: removes the stored tokens, saves the store and
//!    halts with a logged-out confirmation.
//! 3. unconditional: continues only when every configured token is
//!    already stored; otherwise halts with the login view.
//!
//! Tokens live in the top-level store by default, or in the project scope
//! with [`project_scoped`](RequireTokenLogin::project_scoped) (one login
//! per project).
//!
//! ```rust,ignore
//! app.extend(
//!     RequireTokenLogin::new()
//!         .token("api_key", "API Key")
//!         .validator(|tokens| async move { check_key(&tokens["api_key"]).await }),
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use serde_json::Value;
use tracing::debug;

use crate::context::DispatchContext;
use crate::integration::Integration;
use crate::middleware::Flow;
use crate::plugin::Plugin;

/// A credential field collected by the login view.
#[derive(Debug, Clone)]
pub struct TokenField {
    /// The client-state / store key the value travels under.
    pub key: String,
    /// The human-readable label shown next to the input.
    pub name: String,
}

impl TokenField {
    /// Creates a field.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// A token field together with the value the client submitted, if any.
#[derive(Debug, Clone)]
pub struct TokenValue {
    /// The field's store key.
    pub key: String,
    /// The field's label.
    pub name: String,
    /// The submitted value; `None` when rendering an empty form.
    pub value: Option<String>,
}

impl TokenValue {
    fn unfilled(field: &TokenField) -> Self {
        Self {
            key: field.key.clone(),
            name: field.name.clone(),
            value: None,
        }
    }
}

/// Props handed to the login view renderer.
#[derive(Debug, Clone, Default)]
pub struct LoginViewProps {
    /// Validation error to display, if any.
    pub error: Option<String>,
    /// Informational message (e.g. after logout).
    pub message: Option<String>,
    /// The fields to render, with any submitted values echoed back.
    pub tokens: Vec<TokenValue>,
}

type LoginViewFn<R> = Arc<dyn Fn(LoginViewProps) -> R + Send + Sync>;
type ValidatorFn =
    Arc<dyn Fn(HashMap<String, String>) -> BoxFuture<'static, Option<String>> + Send + Sync>;

struct TokenLoginState<R> {
    project_scoped: bool,
    tokens: Vec<TokenField>,
    validator: ValidatorFn,
    login_view: LoginViewFn<R>,
}

/// Gates every dispatch on stored credential tokens.
pub struct RequireTokenLogin<R> {
    project_scoped: bool,
    tokens: Vec<TokenField>,
    validator: ValidatorFn,
    login_view: LoginViewFn<R>,
}

impl<R: From<String>> RequireTokenLogin<R> {
    /// Creates the plugin with the default login view, no validator, and
    /// global (non-project) scoping.
    ///
    /// Without any [`token`](Self::token) call, a single `token` /
    /// "API Token" field is configured at install time.
    pub fn new() -> Self {
        Self {
            project_scoped: false,
            tokens: Vec::new(),
            validator: Arc::new(|_tokens| Box::pin(future::ready(None))),
            login_view: Arc::new(|props| R::from(default_login_view(&props))),
        }
    }
}

impl<R: From<String>> Default for RequireTokenLogin<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RequireTokenLogin<R> {
    /// Stores tokens in the project scope instead of the top-level store.
    pub fn project_scoped(mut self, scoped: bool) -> Self {
        self.project_scoped = scoped;
        self
    }

    /// Adds a credential field.
    pub fn token(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.tokens.push(TokenField::new(key, name));
        self
    }

    /// Sets the async credential validator.
    ///
    /// The validator receives the submitted `key -> value` map and returns
    /// `None` to accept, or `Some(error text)` to reject.
    pub fn validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        self.validator = Arc::new(move |tokens| Box::pin(validator(tokens)));
        self
    }

    /// Replaces the login view renderer.
    pub fn view<F>(mut self, view: F) -> Self
    where
        F: Fn(LoginViewProps) -> R + Send + Sync + 'static,
    {
        self.login_view = Arc::new(view);
        self
    }
}

impl<R: Send + 'static> Plugin<R> for RequireTokenLogin<R> {
    fn install(mut self, app: &mut Integration<R>) {
        if self.tokens.is_empty() {
            self.tokens.push(TokenField::new("token", "API Token"));
        }

        let state = Arc::new(TokenLoginState {
            project_scoped: self.project_scoped,
            tokens: self.tokens,
            validator: self.validator,
            login_view: self.login_view,
        });

        let set_token = Arc::clone(&state);
        app.middleware_on("setToken", move |ctx: DispatchContext<R>| {
            let state = Arc::clone(&set_token);
            async move {
                let values: Vec<TokenValue> = state
                    .tokens
                    .iter()
                    .map(|field| TokenValue {
                        key: field.key.clone(),
                        name: field.name.clone(),
                        value: ctx.get(&field.key).map(str::to_string),
                    })
                    .collect();

                if values
                    .iter()
                    .any(|v| v.value.as_deref().is_none_or(str::is_empty))
                {
                    return Ok(Flow::Halt((state.login_view)(LoginViewProps {
                        error: Some("All fields are required".to_string()),
                        tokens: values,
                        ..LoginViewProps::default()
                    })));
                }

                let submitted: HashMap<String, String> = values
                    .iter()
                    .filter_map(|v| Some((v.key.clone(), v.value.clone()?)))
                    .collect();
                if let Some(error) = (state.validator)(submitted).await {
                    debug!(%error, "token validation rejected");
                    return Ok(Flow::Halt((state.login_view)(LoginViewProps {
                        error: Some(error),
                        tokens: values,
                        ..LoginViewProps::default()
                    })));
                }

                let use_scope = state.project_scoped && ctx.project_id().is_some();
                if use_scope {
                    if let Some(mut scope) = ctx.project_store() {
                        for v in &values {
                            if let Some(value) = &v.value {
                                scope.insert(v.key.clone(), Value::String(value.clone()));
                            }
                        }
                    }
                } else {
                    let mut store = ctx.store();
                    for v in &values {
                        if let Some(value) = &v.value {
                            store.set(v.key.clone(), value.as_str());
                        }
                    }
                }

                ctx.save_store().await?;
                debug!("tokens accepted and stored");
                Ok(Flow::Continue)
            }
        });

        let logout = Arc::clone(&state);
        app.middleware_on("logout", move |ctx: DispatchContext<R>| {
            let state = Arc::clone(&logout);
            async move {
                let use_scope = state.project_scoped && ctx.project_id().is_some();
                if use_scope {
                    if let Some(mut scope) = ctx.project_store() {
                        for field in &state.tokens {
                            scope.remove(&field.key);
                        }
                    }
                } else {
                    let mut store = ctx.store();
                    for field in &state.tokens {
                        store.remove(&field.key);
                    }
                }

                ctx.save_store().await?;
                debug!("tokens cleared");
                Ok(Flow::Halt((state.login_view)(LoginViewProps {
                    message: Some("You have logged out successfully".to_string()),
                    ..LoginViewProps::default()
                })))
            }
        });

        let gate = Arc::clone(&state);
        app.middleware(move |ctx: DispatchContext<R>| {
            let state = Arc::clone(&gate);
            async move {
                let authenticated = if state.project_scoped {
                    ctx.project_store().is_some_and(|scope| {
                        state.tokens.iter().all(|field| scope.contains_key(&field.key))
                    })
                } else {
                    let store = ctx.store();
                    state.tokens.iter().all(|field| store.contains(&field.key))
                };

                if authenticated {
                    Ok(Flow::Continue)
                } else {
                    debug!("missing credentials, rendering login view");
                    Ok(Flow::Halt((state.login_view)(LoginViewProps {
                        tokens: state.tokens.iter().map(TokenValue::unfilled).collect(),
                        ..LoginViewProps::default()
                    })))
                }
            }
        });
    }
}

/// The default login-form markup.
pub fn default_login_view(props: &LoginViewProps) -> String {
    let mut inputs = String::new();
    for token in &props.tokens {
        inputs.push_str(&format!(
            "      <Input label=\"{}\" name=\"{}\" width=\"100%\" value=\"{}\" />\n",
            token.name,
            token.key,
            token.value.as_deref().unwrap_or("")
        ));
    }

    format!(
        "<Page>\n  <Box>{message}</Box>\n  <Fieldset>\n    <FsContent>\n      <FsSubtitle>Please enter the following information</FsSubtitle>\n{inputs}    </FsContent>\n    <FsFooter>\n      <Box width=\"100%\" display=\"flex\" justifyContent=\"space-between\">\n        <Box>{error}</Box>\n        <Button small action=\"setToken\">Connect</Button>\n      </Box>\n    </FsFooter>\n  </Fieldset>\n</Page>",
        message = props.message.as_deref().unwrap_or(""),
        error = props.error.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use braze_core::{HookRequest, MemoryStore, Store};

    fn app() -> Integration<String> {
        let mut app = Integration::new(|_ctx| async move { Ok("default".to_string()) });
        app.extend(RequireTokenLogin::new());
        app
    }

    fn seeded_backend() -> Arc<MemoryStore> {
        let mut store = Store::new();
        store.set("token", "stored");
        Arc::new(MemoryStore::with_document(store))
    }

    #[tokio::test]
    async fn gate_blocks_unauthenticated_dispatches() {
        let result = app()
            .dispatch(HookRequest::new("view"), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(result.contains("Please enter the following information"));
    }

    #[tokio::test]
    async fn gate_passes_when_tokens_are_stored() {
        let result = app()
            .dispatch(HookRequest::new("view"), seeded_backend())
            .await
            .unwrap();
        assert_eq!(result, "default");
    }

    #[tokio::test]
    async fn set_token_requires_all_fields() {
        let result = app()
            .dispatch(HookRequest::new("setToken"), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(result.contains("All fields are required"));
    }

    #[tokio::test]
    async fn set_token_stores_and_continues() {
        let backend = Arc::new(MemoryStore::new());
        let request = HookRequest::new("setToken").with_client_state("token", "abc");

        let result = app()
            .dispatch(request, Arc::clone(&backend) as Arc<dyn braze_core::MetadataStore>)
            .await
            .unwrap();

        // The gate saw the freshly stored token and let the dispatch through.
        assert_eq!(result, "default");
        assert_eq!(backend.snapshot().get_str("token"), Some("abc"));
    }

    #[tokio::test]
    async fn set_token_echoes_validator_rejection() {
        let mut app = Integration::new(|_ctx| async move { Ok("default".to_string()) });
        app.extend(
            RequireTokenLogin::new()
                .validator(|_tokens| async move { Some("Invalid token".to_string()) }),
        );

        let request = HookRequest::new("setToken").with_client_state("token", "bad");
        let result = app
            .dispatch(request, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(result.contains("Invalid token"));
    }

    #[tokio::test]
    async fn logout_clears_tokens_and_halts() {
        let backend = seeded_backend();

        let result = app()
            .dispatch(
                HookRequest::new("logout"),
                Arc::clone(&backend) as Arc<dyn braze_core::MetadataStore>,
            )
            .await
            .unwrap();

        assert!(result.contains("You have logged out successfully"));
        assert!(!backend.snapshot().contains("token"));
    }

    #[tokio::test]
    async fn project_scoped_tokens_live_in_the_scope() {
        let backend = Arc::new(MemoryStore::new());
        let mut app = Integration::new(|_ctx| async move { Ok("default".to_string()) });
        app.extend(RequireTokenLogin::new().project_scoped(true));

        let request = HookRequest::new("setToken")
            .with_project("p1")
            .with_client_state("token", "abc");
        let result = app
            .dispatch(request, Arc::clone(&backend) as Arc<dyn braze_core::MetadataStore>)
            .await
            .unwrap();
        assert_eq!(result, "default");

        let persisted = backend.snapshot();
        assert!(!persisted.contains("token"));
        assert_eq!(
            persisted.scope("p1").and_then(|s| s.get("token")),
            Some(&serde_json::json!("abc"))
        );

        // A different project is still unauthenticated.
        let other = HookRequest::new("view").with_project("p2");
        let blocked = app
            .dispatch(other, Arc::clone(&backend) as Arc<dyn braze_core::MetadataStore>)
            .await
            .unwrap();
        assert!(blocked.contains("Please enter the following information"));
    }

    #[tokio::test]
    async fn project_scoped_gate_blocks_without_a_project() {
        let mut app = Integration::new(|_ctx| async move { Ok("default".to_string()) });
        app.extend(RequireTokenLogin::new().project_scoped(true));

        let result = app
            .dispatch(HookRequest::new("view"), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(result.contains("Please enter the following information"));
    }

    #[tokio::test]
    async fn custom_fields_render_in_the_login_view() {
        let mut app = Integration::new(|_ctx| async move { Ok("default".to_string()) });
        app.extend(
            RequireTokenLogin::new()
                .token("key", "API Key")
                .token("secret", "API Secret"),
        );

        let result = app
            .dispatch(HookRequest::new("view"), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(result.contains("API Key"));
        assert!(result.contains("API Secret"));
    }
}
