//! Component validation and document rendering.
//!
//! Components and templates are registered at startup under logical names and
//! looked up by the absolute path those names resolve to:
//!
//! ```rust,ignore
//! use edge_render::*;
//!
//! let mut registry = ArtifactRegistry::new();
//! registry.register_component(&config.components_directory, "App.js", component_fn(|props| {
//!     Ok(format!("<h1>{}</h1>", props["title"]))
//! }));
//!
//! let setup = validate(&request, &config, &registry).await?;
//! let html = Renderer::new(&config.doctype).render(&setup, &props, &meta)?;
//! ```
//!
//! Enable the `leptos` feature to register Leptos views as components.

mod artifact;
mod document;
mod embed;
mod renderer;
mod validate;

#[cfg(feature = "leptos")]
mod leptos_view;

pub use artifact::*;
pub use document::*;
pub use embed::*;
pub use renderer::*;
pub use validate::*;

#[cfg(feature = "leptos")]
pub use leptos_view::LeptosComponent;
