//! Project-selection gating.
//!
//! [`RequireProject`] installs one unconditional middleware: when the
//! request carries a project id the dispatch continues; otherwise it halts
//! with a "please select a project" view and nothing downstream runs.
//!
//! ```rust,ignore
//! let mut app: Integration<String> = Integration::new(default_route);
//! app.extend(RequireProject::new());
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::context::DispatchContext;
use crate::integration::Integration;
use crate::middleware::Flow;
use crate::plugin::Plugin;

type ViewFn<R> = Arc<dyn Fn() -> R + Send + Sync>;

/// Gates every dispatch on a selected project.
pub struct RequireProject<R> {
    switch_project_view: ViewFn<R>,
}

impl<R: From<String>> RequireProject<R> {
    /// Creates the plugin with the default project-switcher view.
    pub fn new() -> Self {
        Self {
            switch_project_view: Arc::new(|| R::from(default_switch_project_view())),
        }
    }
}

impl<R: From<String>> Default for RequireProject<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RequireProject<R> {
    /// Replaces the view rendered when no project is selected.
    pub fn view<F>(mut self, view: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.switch_project_view = Arc::new(view);
        self
    }
}

impl<R: Send + 'static> Plugin<R> for RequireProject<R> {
    fn install(self, app: &mut Integration<R>) {
        let view = self.switch_project_view;
        app.middleware(move |ctx: DispatchContext<R>| {
            let view = Arc::clone(&view);
            async move {
                if ctx.project_id().is_some() {
                    Ok(Flow::Continue)
                } else {
                    debug!("no project selected, rendering project switcher");
                    Ok(Flow::Halt(view()))
                }
            }
        });
    }
}

/// The default project-switcher markup.
pub fn default_switch_project_view() -> String {
    "<Page>\n  <Box display=\"flex\">\n    Please select a project:\n    <Box width=\"5px\"/>\n    <ProjectSwitcher />\n  </Box>\n</Page>"
        .to_string()
}
