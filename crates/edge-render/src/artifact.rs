//! Components, templates and the registry they are loaded from.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use edge_core::{resolve_path, Props};

use crate::document::Document;

/// A server-renderable view unit.
pub trait Component: Send + Sync + 'static {
    /// Render the component with `props` into a markup fragment.
    fn render(&self, props: &Props) -> anyhow::Result<String>;
}

/// Values a template receives next to the rendered component markup.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// Props the component was rendered with.
    pub props: &'a Props,
    /// Request meta, including `bundlePath` and `bundleExpose`.
    pub meta: &'a Props,
}

impl<'a> TemplateContext<'a> {
    /// Read a string value from meta.
    pub fn meta_str(&self, key: &str) -> Option<&'a str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}

/// Wraps rendered component markup into a full document.
pub trait Template: Send + Sync + 'static {
    /// Build the document around `markup`.
    fn wrap(&self, markup: &str, ctx: &TemplateContext<'_>) -> anyhow::Result<Document>;
}

/// A component backed by a closure.
pub struct FnComponent<F>(F);

/// Wrap a closure as a [`Component`].
pub fn component_fn<F>(f: F) -> FnComponent<F>
where
    F: Fn(&Props) -> anyhow::Result<String> + Send + Sync + 'static,
{
    FnComponent(f)
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props) -> anyhow::Result<String> + Send + Sync + 'static,
{
    fn render(&self, props: &Props) -> anyhow::Result<String> {
        (self.0)(props)
    }
}

/// A template backed by a closure.
pub struct FnTemplate<F>(F);

/// Wrap a closure as a [`Template`].
pub fn template_fn<F>(f: F) -> FnTemplate<F>
where
    F: Fn(&str, &TemplateContext<'_>) -> anyhow::Result<Document> + Send + Sync + 'static,
{
    FnTemplate(f)
}

impl<F> Template for FnTemplate<F>
where
    F: Fn(&str, &TemplateContext<'_>) -> anyhow::Result<Document> + Send + Sync + 'static,
{
    fn wrap(&self, markup: &str, ctx: &TemplateContext<'_>) -> anyhow::Result<Document> {
        (self.0)(markup, ctx)
    }
}

/// Something registered at a path.
#[derive(Clone)]
pub enum Artifact {
    /// A component.
    Component(Arc<dyn Component>),
    /// A template.
    Template(Arc<dyn Template>),
}

impl Artifact {
    /// Human name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Template(_) => "template",
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Artifact::{}", self.kind_name())
    }
}

/// Maps resolved artifact paths to their implementations.
///
/// Populated once at startup; lookups happen by the absolute path a logical
/// name resolves to.
#[derive(Debug, Default, Clone)]
pub struct ArtifactRegistry {
    artifacts: HashMap<PathBuf, Artifact>,
}

impl ArtifactRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact at an already resolved path.
    pub fn insert(&mut self, path: impl Into<PathBuf>, artifact: Artifact) -> Option<Artifact> {
        self.artifacts.insert(path.into(), artifact)
    }

    /// Register a component under `name`, resolved against `base`.
    pub fn register_component(
        &mut self,
        base: &Path,
        name: &str,
        component: impl Component,
    ) -> PathBuf {
        let path = resolve_path(base, name);
        self.insert(path.clone(), Artifact::Component(Arc::new(component)));
        path
    }

    /// Register a template under `name`, resolved against `base`.
    pub fn register_template(&mut self, base: &Path, name: &str, template: impl Template) -> PathBuf {
        let path = resolve_path(base, name);
        self.insert(path.clone(), Artifact::Template(Arc::new(template)));
        path
    }

    /// Look up the artifact at `path`.
    pub fn get(&self, path: &Path) -> Option<&Artifact> {
        self.artifacts.get(path)
    }

    /// Number of registered artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
