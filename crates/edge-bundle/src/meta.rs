//! Public bundle location and exposed symbol for a component.

use std::path::Path;

use edge_core::Props;
use serde::{Deserialize, Serialize};

/// Where a component's bundle is served and what it is exposed as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMeta {
    /// Public URL path of the bundle, e.g. `/js/App.js`.
    pub bundle_path: String,
    /// Symbol the component is importable as on the client.
    pub expose_name: String,
}

impl BundleMeta {
    /// Derive bundle metadata from a resolved component path.
    ///
    /// The bundle file is the component's base name with a `.js` suffix,
    /// placed under `bundle_dir` with exactly one `/` in between.
    pub fn compute(component_path: &Path, bundle_dir: &str, expose_name: &str) -> Self {
        let base = component_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = if base.ends_with(".js") {
            base
        } else {
            format!("{}.js", base)
        };

        Self {
            bundle_path: format!("{}/{}", bundle_dir.trim_end_matches('/'), file_name),
            expose_name: expose_name.to_string(),
        }
    }

    /// File name part of the bundle path.
    pub fn file_name(&self) -> &str {
        self.bundle_path
            .rsplit('/')
            .next()
            .unwrap_or(self.bundle_path.as_str())
    }

    /// Write `bundlePath` and `bundleExpose` into template meta.
    pub fn insert_into(&self, meta: &mut Props) {
        meta.insert("bundlePath".to_string(), self.bundle_path.clone().into());
        meta.insert("bundleExpose".to_string(), self.expose_name.clone().into());
    }
}
