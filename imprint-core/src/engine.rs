use std::collections::HashSet;

use handlebars::{Handlebars, HelperDef};
use serde_json::Value;

use crate::helpers::{DynError, PostBuildTransform};

/// The rendering engine for one compilation run: a handlebars registry plus
/// the set of partial names registered so far and the optional post-build
/// transform. Constructed fresh per run, so nothing leaks between runs.
pub struct Engine {
    registry: Handlebars<'static>,
    partials: HashSet<String>,
    transform: Option<Box<dyn PostBuildTransform>>,
}

impl Engine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        // Missing fields abort the render instead of expanding to nothing,
        // so absent data surfaces as an error the pipeline can attribute.
        registry.set_strict_mode(true);
        Self {
            registry,
            partials: HashSet::new(),
            transform: None,
        }
    }

    pub fn has_partial(&self, name: &str) -> bool {
        self.partials.contains(name)
    }

    /// Register a partial's source under `name`. Registering a name that is
    /// already present is a no-op, which keeps diamond-shaped inclusion
    /// graphs safe.
    pub fn register_partial(
        &mut self,
        name: &str,
        text: &str,
    ) -> Result<(), handlebars::TemplateError> {
        if self.partials.contains(name) {
            return Ok(());
        }
        self.registry.register_partial(name, text)?;
        self.partials.insert(name.to_string());
        Ok(())
    }

    pub fn register_helper(&mut self, name: &str, def: Box<dyn HelperDef + Send + Sync>) {
        self.registry.register_helper(name, def);
    }

    pub fn set_transform(&mut self, transform: Box<dyn PostBuildTransform>) {
        self.transform = Some(transform);
    }

    /// Compile and render a page template against its merged context.
    pub fn render_template(
        &self,
        text: &str,
        context: &Value,
    ) -> Result<String, handlebars::RenderError> {
        self.registry.render_template(text, context)
    }

    /// Apply the post-build transform, if one was registered.
    pub fn post_build(&self, page: &str, html: &str) -> Option<Result<String, DynError>> {
        self.transform.as_ref().map(|t| t.apply(page, html))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
