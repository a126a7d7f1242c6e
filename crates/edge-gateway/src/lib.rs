//! HTTP gateway for server-side rendered components.
//!
//! ```rust,ignore
//! use edge_gateway::*;
//!
//! let gateway = Gateway::builder(config)
//!     .component("App.js", component_fn(|props| Ok(render_app(props))))
//!     .template("_layout.js", template_fn(layout))
//!     .build();
//!
//! gateway.get("/", RenderRequest::new().with_component("App.js").with_bundle(true));
//! gateway.on_error(|err, _res| tracing::error!(error = %err, "render error"));
//! gateway.listen("127.0.0.1:3000").await?;
//! ```
//!
//! Errors reported while no listener is subscribed are fatal: the request is
//! answered with a bare `500` and [`Gateway::serve`] returns
//! [`ServeError::Unhandled`].

mod dispatcher;
mod error_bus;
mod gateway;
mod response;
mod routes;

pub use dispatcher::*;
pub use error_bus::*;
pub use gateway::*;
pub use response::*;
pub use routes::*;
