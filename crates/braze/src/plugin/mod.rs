//! Plugin system for the Braze framework.
//!
//! A plugin is a reusable bundle of `middleware`/`render` registrations
//! applied against an [`Integration`] at composition time via
//! [`Integration::extend`]. Plugins have no runtime hooks: once installed,
//! only their registered handlers exist.
//!
//! The [`Plugin`] trait is blanket-implemented for any
//! `FnOnce(&mut Integration<R>)`, so ad hoc closures and free functions
//! work directly:
//!
//! ```rust,ignore
//! fn admin_routes(app: &mut Integration<String>) {
//!     app.render("admin", |_ctx| async move { Ok(render_admin()) });
//! }
//!
//! app.extend(admin_routes);
//! app.extend(RequireProject::new());
//! ```
//!
//! [`Integration::extend`]: crate::integration::Integration::extend

pub mod builtin;

use crate::integration::Integration;

/// A reusable bundle of registrations.
pub trait Plugin<R> {
    /// Applies this plugin's registrations to `app`.
    fn install(self, app: &mut Integration<R>);
}

impl<R, F> Plugin<R> for F
where
    F: FnOnce(&mut Integration<R>),
{
    fn install(self, app: &mut Integration<R>) {
        self(app)
    }
}
