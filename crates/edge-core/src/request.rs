//! Render options carried by a single request.

use serde::{Deserialize, Serialize};

/// Props passed to a component, and the free-form meta passed to a template.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Options describing what to render for one request.
///
/// Every field is optional so a request can be layered over the configured
/// defaults: a value present on the request wins, a missing one falls back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderRequest {
    /// Logical component name, relative to the components directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Logical template name, relative to the templates directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Props handed to the component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Props>,
    /// Extra values handed to the template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Props>,
    /// Whether to expose a client bundle of the component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<bool>,
    /// Symbol name the bundled component is exposed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose: Option<String>,
}

impl RenderRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the component name.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the template name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the component props.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    /// Add a single prop.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props
            .get_or_insert_with(Props::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the template meta.
    pub fn with_meta(mut self, meta: Props) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Request a client bundle.
    pub fn with_bundle(mut self, bundle: bool) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Override the exposed bundle symbol.
    pub fn with_expose(mut self, expose: impl Into<String>) -> Self {
        self.expose = Some(expose.into());
        self
    }

    /// Layer this request over `defaults`.
    ///
    /// Merging is shallow: `props` and `meta` are replaced as a whole, not
    /// merged key by key.
    pub fn merged_over(&self, defaults: &RenderRequest) -> RenderRequest {
        RenderRequest {
            component: self.component.clone().or_else(|| defaults.component.clone()),
            template: self.template.clone().or_else(|| defaults.template.clone()),
            props: self.props.clone().or_else(|| defaults.props.clone()),
            meta: self.meta.clone().or_else(|| defaults.meta.clone()),
            bundle: self.bundle.or(defaults.bundle),
            expose: self.expose.clone().or_else(|| defaults.expose.clone()),
        }
    }

    /// Whether a bundle was requested.
    pub fn wants_bundle(&self) -> bool {
        self.bundle.unwrap_or(false)
    }

    /// Props, or an empty map.
    pub fn props_or_default(&self) -> Props {
        self.props.clone().unwrap_or_default()
    }

    /// Meta, or an empty map.
    pub fn meta_or_default(&self) -> Props {
        self.meta.clone().unwrap_or_default()
    }
}
