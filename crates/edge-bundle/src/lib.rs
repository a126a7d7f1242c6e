//! Client bundles for rendered components.
//!
//! When a render asks for a bundle, the gateway computes [`BundleMeta`] for
//! the component and hands it to [`BundleRegistry::register`], which installs
//! a GET route for the bundle path the first time it is seen. Requests to that
//! route go through [`BundleRegistry::build`].

mod bundler;
mod cache;
mod meta;
mod registry;

pub use bundler::*;
pub use cache::*;
pub use meta::*;
pub use registry::*;
