//! At-most-once bundle route registration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use edge_core::BundleBuildError;

use crate::bundler::{BundleEntry, Bundler};
use crate::cache::{BuildCache, CacheStatus};
use crate::meta::BundleMeta;

/// A registered bundle: the component it is built from and where it is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    /// Absolute path of the component entry.
    pub component_path: PathBuf,
    /// Public path and exposed symbol.
    pub meta: BundleMeta,
}

impl BundleTarget {
    /// Bundler input for this target.
    pub fn entry(&self) -> BundleEntry {
        BundleEntry {
            component_path: self.component_path.clone(),
            expose_name: self.meta.expose_name.clone(),
        }
    }
}

/// Installs a GET route that serves a bundle.
pub trait RouteInstaller {
    /// Install a route at `target.meta.bundle_path`.
    fn install_bundle_route(&self, target: BundleTarget);
}

/// Set of bundle paths that already have a route.
#[derive(Debug, Default)]
pub struct RegistrationTable {
    paths: Mutex<HashSet<String>>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bundle_path`. Returns false if it was already recorded.
    pub fn try_register(&self, bundle_path: &str) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bundle_path.to_string())
    }

    pub fn contains(&self, bundle_path: &str) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(bundle_path)
    }

    pub fn len(&self) -> usize {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns the registration table and builds bundles for served routes.
///
/// Without a cache every request to a bundle route rebuilds the bundle from
/// disk, so edits to component sources show up on the next request.
pub struct BundleRegistry {
    table: RegistrationTable,
    bundler: Arc<dyn Bundler>,
    cache: Option<BuildCache>,
}

impl BundleRegistry {
    /// Create a registry that rebuilds on every request.
    pub fn new(bundler: Arc<dyn Bundler>) -> Self {
        Self {
            table: RegistrationTable::new(),
            bundler,
            cache: None,
        }
    }

    /// Keep built bundles in memory.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(BuildCache::new());
        self
    }

    /// Whether built bundles are cached.
    pub fn caches(&self) -> bool {
        self.cache.is_some()
    }

    /// Register a bundle route for `component_path` unless `meta.bundle_path`
    /// already has one. Returns true when a route was installed.
    pub fn register(
        &self,
        component_path: &Path,
        meta: &BundleMeta,
        installer: &dyn RouteInstaller,
    ) -> bool {
        if !self.table.try_register(&meta.bundle_path) {
            return false;
        }

        tracing::info!(
            bundle_path = %meta.bundle_path,
            component = %component_path.display(),
            expose = %meta.expose_name,
            "registered bundle route"
        );
        installer.install_bundle_route(BundleTarget {
            component_path: component_path.to_path_buf(),
            meta: meta.clone(),
        });
        true
    }

    /// Whether `bundle_path` has been registered.
    pub fn is_registered(&self, bundle_path: &str) -> bool {
        self.table.contains(bundle_path)
    }

    /// Number of registered bundle routes.
    pub fn registered_count(&self) -> usize {
        self.table.len()
    }

    /// Build the bundle for `target`.
    pub async fn build(
        &self,
        target: &BundleTarget,
    ) -> Result<(Arc<Vec<u8>>, CacheStatus), BundleBuildError> {
        let entry = target.entry();
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_build(&target.meta.bundle_path, || self.bundler.bundle(&entry))
                    .await
            }
            None => {
                let bytes = self.bundler.bundle(&entry).await?;
                Ok((Arc::new(bytes), CacheStatus::Bypass))
            }
        }
    }
}

impl std::fmt::Debug for BundleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleRegistry")
            .field("table", &self.table)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    #[derive(Default)]
    struct SpyInstaller {
        installed: Mutex<Vec<BundleTarget>>,
    }

    impl RouteInstaller for SpyInstaller {
        fn install_bundle_route(&self, target: BundleTarget) {
            self.installed.lock().unwrap().push(target);
        }
    }

    #[derive(Default)]
    struct CountingBundler {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl Bundler for CountingBundler {
        async fn bundle(&self, entry: &BundleEntry) -> Result<Vec<u8>, BundleBuildError> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{}#{}", entry.expose_name, n).into_bytes())
        }
    }

    fn meta() -> BundleMeta {
        BundleMeta::compute(Path::new("/c/App.js"), "/js", "app")
    }

    // === Registration ===

    #[test]
    fn test_table_try_register_once() {
        let table = RegistrationTable::new();
        assert!(table.try_register("/js/App.js"));
        assert!(!table.try_register("/js/App.js"));
        assert!(table.contains("/js/App.js"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_register_installs_once() {
        let registry = BundleRegistry::new(Arc::new(CountingBundler::default()));
        let spy = SpyInstaller::default();

        assert!(registry.register(Path::new("/c/App.js"), &meta(), &spy));
        assert!(!registry.register(Path::new("/c/App.js"), &meta(), &spy));

        let installed = spy.installed.lock().unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].meta.bundle_path, "/js/App.js");
        assert!(registry.is_registered("/js/App.js"));
    }

    #[test]
    fn test_same_path_different_expose_keeps_first() {
        let registry = BundleRegistry::new(Arc::new(CountingBundler::default()));
        let spy = SpyInstaller::default();
        let other = BundleMeta::compute(Path::new("/c/App.js"), "/js", "widget");

        registry.register(Path::new("/c/App.js"), &meta(), &spy);
        registry.register(Path::new("/c/App.js"), &other, &spy);

        let installed = spy.installed.lock().unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].meta.expose_name, "app");
    }

    #[tokio::test]
    async fn test_concurrent_register_installs_once() {
        let registry = Arc::new(BundleRegistry::new(Arc::new(CountingBundler::default())));
        let spy = Arc::new(SpyInstaller::default());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let spy = Arc::clone(&spy);
            handles.push(tokio::spawn(async move {
                registry.register(Path::new("/c/App.js"), &meta(), spy.as_ref())
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(spy.installed.lock().unwrap().len(), 1);
        assert_eq!(registry.registered_count(), 1);
    }

    // === Building ===

    #[tokio::test]
    async fn test_build_without_cache_rebuilds() {
        let registry = BundleRegistry::new(Arc::new(CountingBundler::default()));
        let target = BundleTarget {
            component_path: PathBuf::from("/c/App.js"),
            meta: meta(),
        };

        let (first, status) = registry.build(&target).await.unwrap();
        assert_eq!(status, CacheStatus::Bypass);
        let (second, _) = registry.build(&target).await.unwrap();

        assert_eq!(first.as_slice(), b"app#1");
        assert_eq!(second.as_slice(), b"app#2");
    }

    #[tokio::test]
    async fn test_build_with_cache_reuses() {
        let registry = BundleRegistry::new(Arc::new(CountingBundler::default())).with_cache();
        let target = BundleTarget {
            component_path: PathBuf::from("/c/App.js"),
            meta: meta(),
        };

        let (first, status) = registry.build(&target).await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        let (second, status) = registry.build(&target).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);

        assert_eq!(first, second);
        assert!(registry.caches());
    }
}
