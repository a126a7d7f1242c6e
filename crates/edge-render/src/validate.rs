//! Resolve and validate the component/template pair of a request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use edge_core::{resolve_path, ArtifactKind, GatewayConfig, GatewayError, RenderRequest};

use crate::artifact::{Artifact, ArtifactRegistry, Component, Template};

/// A validated component/template pair, ready to render.
#[derive(Clone)]
pub struct ResolvedSetup {
    /// Absolute path of the component.
    pub component_path: PathBuf,
    /// Absolute path of the template.
    pub template_path: PathBuf,
    /// The loaded component.
    pub component: Arc<dyn Component>,
    /// The loaded template.
    pub template: Arc<dyn Template>,
    /// The request merged over the configured defaults.
    pub options: RenderRequest,
}

impl fmt::Debug for ResolvedSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSetup")
            .field("component_path", &self.component_path)
            .field("template_path", &self.template_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Resolve `request` against `config` and load both artifacts from `registry`.
///
/// The component and template probes run concurrently and both always
/// complete; when both fail the component error is reported.
pub async fn validate(
    request: &RenderRequest,
    config: &GatewayConfig,
    registry: &ArtifactRegistry,
) -> Result<ResolvedSetup, GatewayError> {
    let options = request.merged_over(&config.defaults);

    let component_path = resolve_path(
        &config.components_directory,
        options.component.as_deref().unwrap_or_default(),
    );
    let template_path = resolve_path(
        &config.templates_directory,
        options.template.as_deref().unwrap_or_default(),
    );

    let (component, template) = futures::join!(
        load(&component_path, ArtifactKind::Component, registry),
        load(&template_path, ArtifactKind::Template, registry),
    );

    let component = match component? {
        Artifact::Component(component) => component,
        other => return Err(shape_error(&component_path, ArtifactKind::Component, &other)),
    };
    let template = match template? {
        Artifact::Template(template) => template,
        other => return Err(shape_error(&template_path, ArtifactKind::Template, &other)),
    };

    tracing::debug!(
        component = %component_path.display(),
        template = %template_path.display(),
        "validated render setup"
    );

    Ok(ResolvedSetup {
        component_path,
        template_path,
        component,
        template,
        options,
    })
}

/// Check that `path` exists on disk and has a registered artifact.
pub async fn check_path(path: &Path) -> Result<(), GatewayError> {
    tokio::fs::metadata(path)
        .await
        .map(|_| ())
        .map_err(|err| GatewayError::not_found(path, &err))
}

async fn load(
    path: &Path,
    kind: ArtifactKind,
    registry: &ArtifactRegistry,
) -> Result<Artifact, GatewayError> {
    check_path(path).await?;

    registry.get(path).cloned().ok_or_else(|| GatewayError::NotFound {
        path: path.to_path_buf(),
        reason: format!("no {} is registered at this path", kind),
    })
}

fn shape_error(path: &Path, expected: ArtifactKind, found: &Artifact) -> GatewayError {
    GatewayError::InvalidArtifact {
        path: path.to_path_buf(),
        kind: expected,
        reason: format!("found a {}", found.kind_name()),
    }
}
