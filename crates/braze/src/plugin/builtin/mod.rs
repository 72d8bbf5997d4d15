//! Built-in plugins.
//!
//! These are the reference consumers of the public API: gating plugins
//! built purely from `middleware`/`render` registrations, with no access
//! to engine internals.
//!
//! - [`project::RequireProject`]: blocks dispatches until a project is
//!   selected.
//! - [`token_login::RequireTokenLogin`]: blocks dispatches until the
//!   configured credential tokens are stored, and handles the
//!   `setToken`/`logout` actions.

pub mod project;
pub mod token_login;

pub use project::RequireProject;
pub use token_login::{LoginViewProps, RequireTokenLogin, TokenField, TokenValue};
