//! Error types for the render pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Kind of artifact a path was expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A renderable component.
    Component,
    /// A document template.
    Template,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component => write!(f, "component"),
            Self::Template => write!(f, "template"),
        }
    }
}

/// Errors raised while building a client bundle.
#[derive(Debug, Error)]
pub enum BundleBuildError {
    /// A module could not be read.
    #[error("Cannot find module '{module}': {reason}")]
    ModuleNotFound { module: String, reason: String },

    /// A module could not be packed.
    #[error("Failed to compile module '{module}': {reason}")]
    Compile { module: String, reason: String },
}

/// Errors that can occur while turning a request into a response.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A resolved component or template path does not exist or is not loadable.
    #[error("{}: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    /// A loaded artifact failed its shape check.
    #[error("{} is not a valid {kind}: {reason}", path.display())]
    InvalidArtifact {
        path: PathBuf,
        kind: ArtifactKind,
        reason: String,
    },

    /// The component or the template failed while rendering.
    #[error("Render error in {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The bundler failed.
    #[error(transparent)]
    BundleBuild(#[from] BundleBuildError),

    /// Every `done` handle of a deferred resolver was dropped unused.
    #[error("Deferred options were never delivered")]
    DeferredAbandoned,

    /// Deferred option resolution exceeded the configured bound.
    #[error("Deferred options not delivered within {0:?}")]
    DeferredTimeout(Duration),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Build a not-found error from a filesystem error.
    pub fn not_found(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::NotFound {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Status code a client should see for this error.
    pub fn status(&self) -> http::StatusCode {
        http::StatusCode::INTERNAL_SERVER_ERROR
    }

    /// The error message followed by its source chain, one cause per line.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            detail.push_str("\ncaused by: ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

/// An error reported while no error listener was registered.
///
/// This is not recoverable: whoever receives it must stop the offending code
/// path rather than answer the request.
#[derive(Debug, Error)]
#[error("Unhandled gateway error: {0}")]
pub struct UnhandledError(pub Arc<GatewayError>);

impl UnhandledError {
    /// The error that went unhandled.
    pub fn error(&self) -> &Arc<GatewayError> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_path_and_os_text() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let raw = std::fs::metadata("/no/such/App.js").unwrap_err();
        let err = GatewayError::not_found("/no/such/App.js", &raw);

        let message = err.to_string();
        assert!(message.contains("/no/such/App.js"));
        assert!(message.contains("No such file"));
        assert_eq!(raw.kind(), io.kind());
    }

    #[test]
    fn test_invalid_artifact_message() {
        let err = GatewayError::InvalidArtifact {
            path: PathBuf::from("/t/_layout.js"),
            kind: ArtifactKind::Template,
            reason: "registered as a component".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "/t/_layout.js is not a valid template: registered as a component"
        );
    }

    #[test]
    fn test_bundle_error_is_transparent() {
        let err = GatewayError::from(BundleBuildError::ModuleNotFound {
            module: "/c/NotFound.js".to_string(),
            reason: "No such file or directory (os error 2)".to_string(),
        });

        assert!(err.to_string().starts_with("Cannot find module '/c/NotFound.js'"));
    }

    #[test]
    fn test_detail_includes_source_chain() {
        let err = GatewayError::Render {
            path: PathBuf::from("/c/App.js"),
            source: anyhow::anyhow!("inner failure").context("rendering header"),
        };

        let detail = err.detail();
        assert!(detail.starts_with("Render error in /c/App.js"));
        assert!(detail.contains("caused by: inner failure"));
        assert_eq!(err.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
