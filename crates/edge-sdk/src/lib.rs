//! Public SDK for the edge render gateway.
//!
//! This crate re-exports all gateway functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let config = GatewayConfig::load("gateway.toml")?.apply_env().resolve(&cwd);
//! let gateway = Gateway::builder(config)
//!     .component("App.js", component_fn(|props| Ok(format!("<h1>{}</h1>", props["title"]))))
//!     .template("_layout.js", template_fn(|markup, ctx| {
//!         Ok(Document::new(HeadContent::new("App")).with_mount("app", markup))
//!     }))
//!     .build();
//!
//! gateway.get("/", RenderRequest::new().with_component("App.js").with_bundle(true));
//! gateway.on_error(|err, _res| tracing::error!(error = %err, "request failed"));
//! gateway.listen("0.0.0.0:3000").await?;
//! ```

pub use edge_bundle;
pub use edge_core;
pub use edge_gateway;
pub use edge_observability;
pub use edge_render;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_bundle::*;
    pub use edge_core::*;
    pub use edge_gateway::*;
    pub use edge_observability::*;
    pub use edge_render::*;
}
