//! Client bundle building.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use edge_core::{BundleBuildError, BundleSettings};
use futures::future::try_join_all;

/// What to bundle: a component entry and the name it is exposed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Absolute path of the component's client module.
    pub component_path: PathBuf,
    /// Module id the component is exposed as.
    pub expose_name: String,
}

/// Produces client-side bundles.
#[async_trait]
pub trait Bundler: Send + Sync + 'static {
    /// Build a bundle for `entry`.
    async fn bundle(&self, entry: &BundleEntry) -> Result<Vec<u8>, BundleBuildError>;
}

/// Loader prepended to every bundle. Defines a global `require` that
/// instantiates modules lazily and caches their exports.
const PRELUDE: &str = "require=(function(modules){var cache={};\
function load(id){if(cache[id])return cache[id].exports;\
var def=modules[id];if(!def){var err=new Error(\"Cannot find module '\"+id+\"'\");\
err.code=\"MODULE_NOT_FOUND\";throw err;}\
var module=cache[id]={exports:{}};def.call(module.exports,load,module,module.exports);\
return module.exports;}return load;})({\n";

const EPILOGUE: &str = "});\n";

/// Packs the vendor runtime modules and the component into a single script.
///
/// Every module is wrapped in a CommonJS-style factory and registered under
/// its id: vendor modules under their configured ids, the component under the
/// entry's expose name. Imports inside modules are resolved at runtime in the
/// browser against those ids only.
#[derive(Debug, Clone)]
pub struct ModuleBundler {
    vendor_directory: PathBuf,
    vendor_modules: Vec<String>,
}

impl ModuleBundler {
    /// Create a bundler reading `<vendor_directory>/<id>.js` for each id.
    pub fn new(vendor_directory: impl Into<PathBuf>, vendor_modules: Vec<String>) -> Self {
        Self {
            vendor_directory: vendor_directory.into(),
            vendor_modules,
        }
    }

    /// Create a bundler from gateway bundle settings.
    pub fn from_settings(settings: &BundleSettings) -> Self {
        Self::new(&settings.vendor_directory, settings.vendor_modules.clone())
    }

    /// Path a vendor module is read from.
    pub fn vendor_path(&self, id: &str) -> PathBuf {
        self.vendor_directory.join(format!("{}.js", id))
    }
}

#[async_trait]
impl Bundler for ModuleBundler {
    async fn bundle(&self, entry: &BundleEntry) -> Result<Vec<u8>, BundleBuildError> {
        let vendor = try_join_all(self.vendor_modules.iter().map(|id| async move {
            let source = read_module(&self.vendor_path(id), id).await?;
            Ok::<_, BundleBuildError>((id.clone(), source))
        }));
        let component_id = entry.component_path.display().to_string();
        let component = read_module(&entry.component_path, &component_id);
        let (vendor, component) = futures::try_join!(vendor, component)?;

        let mut out = String::from(PRELUDE);
        for (id, source) in &vendor {
            push_module(&mut out, id, source)?;
        }
        push_module(&mut out, &entry.expose_name, &component)?;
        out.push_str(EPILOGUE);

        tracing::debug!(
            component = %entry.component_path.display(),
            expose = %entry.expose_name,
            modules = vendor.len() + 1,
            bytes = out.len(),
            "bundle built"
        );

        Ok(out.into_bytes())
    }
}

async fn read_module(path: &Path, module: &str) -> Result<String, BundleBuildError> {
    tokio::fs::read_to_string(path).await.map_err(|err| match err.kind() {
        ErrorKind::InvalidData => BundleBuildError::Compile {
            module: module.to_string(),
            reason: "module source is not valid UTF-8".to_string(),
        },
        _ => BundleBuildError::ModuleNotFound {
            module: module.to_string(),
            reason: err.to_string(),
        },
    })
}

fn push_module(out: &mut String, id: &str, source: &str) -> Result<(), BundleBuildError> {
    let key = serde_json::to_string(id).map_err(|e| BundleBuildError::Compile {
        module: id.to_string(),
        reason: e.to_string(),
    })?;
    out.push_str(&key);
    out.push_str(":function(require,module,exports){\n");
    out.push_str(source);
    out.push_str("\n},\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("react.js"), "module.exports = { name: 'react' };").unwrap();
        std::fs::write(
            dir.path().join("react-dom.js"),
            "module.exports = { name: 'react-dom' };",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("App.js"),
            "var React = require('react');\nmodule.exports = function App() {};",
        )
        .unwrap();
        dir
    }

    fn bundler(dir: &tempfile::TempDir) -> ModuleBundler {
        ModuleBundler::new(dir.path(), vec!["react".to_string(), "react-dom".to_string()])
    }

    #[tokio::test]
    async fn test_bundle_contains_all_modules() {
        let dir = vendor_dir();
        let entry = BundleEntry {
            component_path: dir.path().join("App.js"),
            expose_name: "qux".to_string(),
        };

        let out = String::from_utf8(bundler(&dir).bundle(&entry).await.unwrap()).unwrap();

        assert!(out.starts_with("require=(function(modules)"));
        assert!(out.contains(r#""react":function(require,module,exports){"#));
        assert!(out.contains(r#""react-dom":function(require,module,exports){"#));
        assert!(out.contains(r#""qux":function(require,module,exports){"#));
        assert!(out.contains("module.exports = function App() {};"));
        assert!(out.ends_with("});\n"));
    }

    #[tokio::test]
    async fn test_missing_component_cannot_find_module() {
        let dir = vendor_dir();
        let entry = BundleEntry {
            component_path: dir.path().join("NotFound.js"),
            expose_name: "qux".to_string(),
        };

        let err = bundler(&dir).bundle(&entry).await.unwrap_err();

        assert!(matches!(err, BundleBuildError::ModuleNotFound { .. }));
        assert!(err.to_string().contains("Cannot find module"));
        assert!(err.to_string().contains("NotFound.js"));
    }

    #[tokio::test]
    async fn test_missing_vendor_module() {
        let dir = vendor_dir();
        let bundler = ModuleBundler::new(dir.path(), vec!["preact".to_string()]);
        let entry = BundleEntry {
            component_path: dir.path().join("App.js"),
            expose_name: "app".to_string(),
        };

        let err = bundler.bundle(&entry).await.unwrap_err();

        assert!(err.to_string().starts_with("Cannot find module 'preact'"));
    }

    #[tokio::test]
    async fn test_non_utf8_module_is_compile_error() {
        let dir = vendor_dir();
        std::fs::write(dir.path().join("Binary.js"), [0xff, 0xfe, 0x00]).unwrap();
        let entry = BundleEntry {
            component_path: dir.path().join("Binary.js"),
            expose_name: "app".to_string(),
        };

        let err = bundler(&dir).bundle(&entry).await.unwrap_err();

        assert!(matches!(err, BundleBuildError::Compile { .. }));
    }

    #[test]
    fn test_from_settings_defaults() {
        let bundler = ModuleBundler::from_settings(&BundleSettings::default());
        assert_eq!(bundler.vendor_path("runtime"), PathBuf::from("./vendor/runtime.js"));
        assert_eq!(bundler.vendor_modules, vec!["runtime", "runtime-dom"]);
    }
}
