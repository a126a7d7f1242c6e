//! Render a validated setup into a complete HTML document.

use edge_core::{GatewayError, Props};

use crate::artifact::TemplateContext;
use crate::validate::ResolvedSetup;

/// Renders components into their templates.
#[derive(Debug, Clone)]
pub struct Renderer {
    doctype: String,
}

impl Renderer {
    /// Create a renderer that prefixes documents with `doctype`.
    pub fn new(doctype: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
        }
    }

    /// The configured doctype.
    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    /// Render `setup` with `props`, handing `meta` to the template.
    pub fn render(
        &self,
        setup: &ResolvedSetup,
        props: &Props,
        meta: &Props,
    ) -> Result<String, GatewayError> {
        let fragment = setup
            .component
            .render(props)
            .map_err(|source| GatewayError::Render {
                path: setup.component_path.clone(),
                source,
            })?;

        let ctx = TemplateContext { props, meta };
        let document = setup
            .template
            .wrap(&fragment, &ctx)
            .map_err(|source| GatewayError::Render {
                path: setup.template_path.clone(),
                source,
            })?;

        let markup = document.to_markup();
        let mut html = String::with_capacity(self.doctype.len() + markup.len());
        html.push_str(&self.doctype);
        html.push_str(&markup);
        Ok(html)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("<!doctype html>")
    }
}
