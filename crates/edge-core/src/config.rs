//! Gateway configuration.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::request::RenderRequest;

/// Environment variable that overrides [`GatewayConfig::environment`].
pub const ENVIRONMENT_VAR: &str = "EDGE_ENV";

/// Deployment environment, deciding how much of an error reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Trusted context: raw error messages are shown.
    #[default]
    Development,
    /// Untrusted context: only the generic error message is shown.
    Production,
}

impl Environment {
    /// Parse an environment name. Anything but `production`/`prod` is development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether raw error details may be shown to clients.
    pub fn exposes_errors(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Client bundle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    /// Directory holding the vendor modules packed into every bundle.
    pub vendor_directory: PathBuf,
    /// Vendor module ids, each read from `<vendor_directory>/<id>.js`.
    pub vendor_modules: Vec<String>,
    /// Cache built bundles and coalesce concurrent builds.
    pub cache: bool,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            vendor_directory: PathBuf::from("./vendor"),
            vendor_modules: vec!["runtime".to_string(), "runtime-dom".to_string()],
            cache: false,
        }
    }
}

/// Configuration for a render gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base directory component names resolve against.
    pub components_directory: PathBuf,
    /// Base directory template names resolve against.
    pub templates_directory: PathBuf,
    /// Public URL prefix bundles are served under.
    pub bundle_directory: String,
    /// Symbol a bundled component is exposed under.
    pub default_expose_name: String,
    /// Message shown instead of raw errors in production.
    pub default_error_message: String,
    /// Doctype prefixed to every rendered document.
    pub doctype: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Render options every request is merged over.
    pub defaults: RenderRequest,
    /// Upper bound on deferred option resolution, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_timeout_ms: Option<u64>,
    /// Client bundle settings.
    pub bundle: BundleSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            components_directory: PathBuf::from("./components"),
            templates_directory: PathBuf::from("./templates"),
            bundle_directory: "/js".to_string(),
            default_expose_name: "app".to_string(),
            default_error_message: "An error happened".to_string(),
            doctype: "<!doctype html>".to_string(),
            environment: Environment::default(),
            defaults: RenderRequest::default(),
            deferred_timeout_ms: None,
            bundle: BundleSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a TOML or JSON file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Set the components directory.
    pub fn with_components_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.components_directory = dir.into();
        self
    }

    /// Set the templates directory.
    pub fn with_templates_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_directory = dir.into();
        self
    }

    /// Set the public bundle directory.
    pub fn with_bundle_directory(mut self, dir: impl Into<String>) -> Self {
        self.bundle_directory = dir.into();
        self
    }

    /// Set the default expose name.
    pub fn with_expose_name(mut self, name: impl Into<String>) -> Self {
        self.default_expose_name = name.into();
        self
    }

    /// Set the generic error message.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.default_error_message = message.into();
        self
    }

    /// Set the doctype.
    pub fn with_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = doctype.into();
        self
    }

    /// Set the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the default render options.
    pub fn with_defaults(mut self, defaults: RenderRequest) -> Self {
        self.defaults = defaults;
        self
    }

    /// Bound deferred option resolution.
    pub fn with_deferred_timeout(mut self, timeout: Duration) -> Self {
        self.deferred_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the bundle settings.
    pub fn with_bundle(mut self, bundle: BundleSettings) -> Self {
        self.bundle = bundle;
        self
    }

    /// Deferred resolution timeout, if any.
    pub fn deferred_timeout(&self) -> Option<Duration> {
        self.deferred_timeout_ms.map(Duration::from_millis)
    }

    /// Apply an environment override such as the value of [`ENVIRONMENT_VAR`].
    pub fn with_environment_override(mut self, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.environment = Environment::parse(value);
        }
        self
    }

    /// Apply overrides taken from the process environment.
    pub fn apply_env(self) -> Self {
        let value = std::env::var(ENVIRONMENT_VAR).ok();
        self.with_environment_override(value.as_deref())
    }

    /// Make every directory absolute against `cwd`.
    pub fn resolve(mut self, cwd: &Path) -> Self {
        self.components_directory = absolutize(cwd, &self.components_directory);
        self.templates_directory = absolutize(cwd, &self.templates_directory);
        self.bundle.vendor_directory = absolutize(cwd, &self.bundle.vendor_directory);
        self
    }
}

/// Resolve a logical name against a base directory.
///
/// Absolute names are kept, relative ones are joined onto `base`, and an empty
/// name resolves to `base` itself. The result is lexically normalized.
pub fn resolve_path(base: &Path, name: &str) -> PathBuf {
    if name.is_empty() {
        return normalize_path(base);
    }
    absolutize(base, Path::new(name))
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Remove `.` segments and fold `..` segments without touching the filesystem.
///
/// A `..` with no named segment before it is kept on relative paths and
/// dropped at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // === Defaults ===

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.components_directory, PathBuf::from("./components"));
        assert_eq!(config.templates_directory, PathBuf::from("./templates"));
        assert_eq!(config.bundle_directory, "/js");
        assert_eq!(config.default_expose_name, "app");
        assert_eq!(config.default_error_message, "An error happened");
        assert_eq!(config.doctype, "<!doctype html>");
        assert_eq!(config.environment, Environment::Development);
        assert!(config.deferred_timeout().is_none());
        assert!(!config.bundle.cache);
    }

    #[test]
    fn test_config_builder_chain() {
        let config = GatewayConfig::new()
            .with_components_directory("./test-components")
            .with_templates_directory("./test-templates")
            .with_bundle_directory("/assets/")
            .with_expose_name("widget")
            .with_environment(Environment::Production)
            .with_deferred_timeout(Duration::from_millis(250));

        assert_eq!(config.bundle_directory, "/assets/");
        assert_eq!(config.default_expose_name, "widget");
        assert!(!config.environment.exposes_errors());
        assert_eq!(config.deferred_timeout(), Some(Duration::from_millis(250)));
    }

    // === Environment ===

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }

    #[test]
    fn test_environment_override() {
        let config = GatewayConfig::new().with_environment_override(Some("production"));
        assert_eq!(config.environment, Environment::Production);

        let config = config.with_environment_override(None);
        assert_eq!(config.environment, Environment::Production);
    }

    // === Loading ===

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
components_directory = "./test-components"
bundle_directory = "/static/js/"
environment = "production"

[defaults]
template = "_layout.js"

[bundle]
vendor_modules = ["react", "react-dom"]
cache = true
"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();

        assert_eq!(config.components_directory, PathBuf::from("./test-components"));
        assert_eq!(config.templates_directory, PathBuf::from("./templates"));
        assert_eq!(config.bundle_directory, "/static/js/");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.defaults.template.as_deref(), Some("_layout.js"));
        assert_eq!(config.bundle.vendor_modules, vec!["react", "react-dom"]);
        assert!(config.bundle.cache);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"doctype": "<!DOCTYPE html>", "deferred_timeout_ms": 500}}"#).unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();

        assert_eq!(config.doctype, "<!DOCTYPE html>");
        assert_eq!(config.deferred_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GatewayConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    // === Paths ===

    #[test]
    fn test_resolve_path_relative() {
        let base = Path::new("/srv/app/components");
        assert_eq!(
            resolve_path(base, "App.js"),
            PathBuf::from("/srv/app/components/App.js")
        );
        assert_eq!(
            resolve_path(base, "./nested/../App.js"),
            PathBuf::from("/srv/app/components/App.js")
        );
    }

    #[test]
    fn test_resolve_path_absolute_and_empty() {
        let base = Path::new("/srv/app/components");
        assert_eq!(resolve_path(base, "/other/App.js"), PathBuf::from("/other/App.js"));
        assert_eq!(resolve_path(base, ""), PathBuf::from("/srv/app/components"));
    }

    #[test]
    fn test_normalize_keeps_leading_parent_dirs() {
        assert_eq!(
            resolve_path(Path::new("../components"), "App.js"),
            PathBuf::from("../components/App.js")
        );
        assert_eq!(
            normalize_path(Path::new("../../a/./b/../c")),
            PathBuf::from("../../a/c")
        );
        assert_eq!(normalize_path(Path::new("/../srv/app")), PathBuf::from("/srv/app"));
    }

    #[test]
    fn test_default_config_resolves_to_absolute_paths() {
        let config = GatewayConfig::default().resolve(Path::new("/work/site"));
        let component = resolve_path(&config.components_directory, "App.js");

        assert!(component.is_absolute());
        assert_eq!(component, PathBuf::from("/work/site/components/App.js"));
    }

    #[test]
    fn test_config_resolve_keeps_parent_of_cwd() {
        let config = GatewayConfig::new()
            .with_components_directory("../components")
            .resolve(Path::new("/work/site"));

        assert_eq!(config.components_directory, PathBuf::from("/work/components"));
    }

    #[test]
    fn test_config_resolve_against_cwd() {
        let config = GatewayConfig::new()
            .with_components_directory("./test-components/")
            .resolve(Path::new("/work"));

        assert_eq!(config.components_directory, PathBuf::from("/work/test-components"));
        assert_eq!(config.templates_directory, PathBuf::from("/work/templates"));
        assert_eq!(config.bundle.vendor_directory, PathBuf::from("/work/vendor"));
    }
}
