//! Dynamic GET route table.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use edge_bundle::{BundleTarget, RouteInstaller};

use crate::dispatcher::RouteOptions;

/// What a path serves.
#[derive(Debug, Clone)]
pub enum Route {
    /// A rendered page.
    Page(RouteOptions),
    /// A client bundle.
    Bundle(BundleTarget),
}

/// Exact-path route table. Routes can be added while serving.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<String, Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the route at `path`.
    pub fn insert(&self, path: impl Into<String>, route: Route) {
        let path = path.into();
        tracing::debug!(path = %path, "route added");
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, route);
    }

    pub fn get(&self, path: &str) -> Option<Route> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl RouteInstaller for RouteTable {
    /// Install a bundle route. A page already served at the bundle path is
    /// kept and the bundle is not reachable.
    fn install_bundle_route(&self, target: BundleTarget) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes.entry(target.meta.bundle_path.clone()) {
            Entry::Occupied(entry) if matches!(entry.get(), Route::Page(_)) => {
                tracing::warn!(
                    path = %entry.key(),
                    component = %target.component_path.display(),
                    "bundle path is taken by a page route, bundle not installed"
                );
            }
            Entry::Occupied(mut entry) => {
                entry.insert(Route::Bundle(target));
            }
            Entry::Vacant(entry) => {
                tracing::debug!(path = %entry.key(), "bundle route added");
                entry.insert(Route::Bundle(target));
            }
        }
    }
}
