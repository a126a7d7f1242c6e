//! The gateway facade: route registration, rendering, bundle serving and the
//! axum adapter.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use edge_bundle::{BundleMeta, BundleRegistry, BundleTarget, Bundler, ModuleBundler};
use edge_core::{
    DispatchPhase, GatewayConfig, GatewayError, RenderRequest, RequestContext, UnhandledError,
};
use edge_observability::{LogLevel, RequestLogger};
use edge_render::{validate, ArtifactRegistry, Component, Renderer, ResolvedSetup, Template};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;

use crate::dispatcher::{wait_for_options, Delivery, DispatchState, RouteOptions};
use crate::error_bus::{ErrorBus, ErrorListener};
use crate::response::{ResponseWriter, JAVASCRIPT};
use crate::routes::{Route, RouteTable};

const BUNDLE_CACHE_HEADER: HeaderName = HeaderName::from_static("x-bundle-cache");

/// Errors that stop [`Gateway::serve`].
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error was reported while no error listener was registered.
    #[error(transparent)]
    Unhandled(#[from] UnhandledError),
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Doctype-prefixed document.
    pub html: String,
    /// The validated component/template pair.
    pub setup: ResolvedSetup,
    /// Bundle location for the rendered component.
    pub bundle: BundleMeta,
}

struct Inner {
    config: GatewayConfig,
    workload: String,
    artifacts: ArtifactRegistry,
    renderer: Renderer,
    bundles: BundleRegistry,
    routes: RouteTable,
    errors: ErrorBus,
}

/// Server-side rendering gateway.
///
/// Cheap to clone; clones share routes, listeners and registrations.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    workload: String,
    artifacts: ArtifactRegistry,
    bundler: Option<Arc<dyn Bundler>>,
}

impl GatewayBuilder {
    /// Name used in request logs.
    pub fn workload(mut self, name: impl Into<String>) -> Self {
        self.workload = name.into();
        self
    }

    /// Register a component under `name`, relative to the components directory.
    pub fn component(mut self, name: &str, component: impl Component) -> Self {
        self.artifacts
            .register_component(&self.config.components_directory, name, component);
        self
    }

    /// Register a template under `name`, relative to the templates directory.
    pub fn template(mut self, name: &str, template: impl Template) -> Self {
        self.artifacts
            .register_template(&self.config.templates_directory, name, template);
        self
    }

    /// Replace the default module bundler.
    pub fn bundler(mut self, bundler: impl Bundler) -> Self {
        self.bundler = Some(Arc::new(bundler));
        self
    }

    pub fn build(self) -> Gateway {
        let config = self.config;
        let bundler = self
            .bundler
            .unwrap_or_else(|| Arc::new(ModuleBundler::from_settings(&config.bundle)));
        let mut bundles = BundleRegistry::new(bundler);
        if config.bundle.cache {
            bundles = bundles.with_cache();
        }

        tracing::info!(
            workload = %self.workload,
            components = %config.components_directory.display(),
            templates = %config.templates_directory.display(),
            artifacts = self.artifacts.len(),
            environment = ?config.environment,
            "gateway built"
        );

        Gateway {
            inner: Arc::new(Inner {
                renderer: Renderer::new(config.doctype.clone()),
                errors: ErrorBus::new(config.environment, config.default_error_message.clone()),
                workload: self.workload,
                artifacts: self.artifacts,
                bundles,
                routes: RouteTable::new(),
                config,
            }),
        }
    }
}

impl Gateway {
    /// Start building a gateway. Relative directories in `config` are
    /// resolved against the current working directory.
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        let config = match std::env::current_dir() {
            Ok(cwd) => config.resolve(&cwd),
            Err(err) => {
                tracing::warn!(error = %err, "cannot read working directory, keeping relative paths");
                config
            }
        };
        GatewayBuilder {
            config,
            workload: "edge-gateway".to_string(),
            artifacts: ArtifactRegistry::new(),
            bundler: None,
        }
    }

    /// A gateway with no registered artifacts.
    pub fn new(config: GatewayConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn bundles(&self) -> &BundleRegistry {
        &self.inner.bundles
    }

    pub fn errors(&self) -> &ErrorBus {
        &self.inner.errors
    }

    // === Routes ===

    /// Serve a rendered page at `path`.
    pub fn get(&self, path: impl Into<String>, options: impl Into<RouteOptions>) {
        self.inner.routes.insert(path, Route::Page(options.into()));
    }

    /// Subscribe to reported errors. While no listener is subscribed every
    /// reported error is fatal.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&Arc<GatewayError>, Option<&ResponseWriter>) + Send + Sync + 'static,
    {
        self.inner.errors.subscribe(listener);
    }

    /// Subscribe a listener object.
    pub fn add_error_listener(&self, listener: impl ErrorListener) {
        self.inner.errors.subscribe(listener);
    }

    /// Install a bundle route for `component_path` unless its bundle path is
    /// already registered.
    pub fn register_bundle(&self, component_path: &Path, meta: &BundleMeta) -> bool {
        self.inner
            .bundles
            .register(component_path, meta, &self.inner.routes)
    }

    // === Rendering ===

    /// Validate and render `request`, registering its bundle when asked to.
    pub async fn render(&self, request: RenderRequest) -> Result<Rendered, GatewayError> {
        let inner = &self.inner;
        let setup = validate(&request, &inner.config, &inner.artifacts).await?;
        let options = &setup.options;

        let expose = options
            .expose
            .as_deref()
            .unwrap_or(&inner.config.default_expose_name);
        let bundle = BundleMeta::compute(&setup.component_path, &inner.config.bundle_directory, expose);

        let props = options.props_or_default();
        let mut meta = options.meta_or_default();
        bundle.insert_into(&mut meta);

        let html = inner.renderer.render(&setup, &props, &meta)?;

        if options.wants_bundle() {
            self.register_bundle(&setup.component_path, &bundle);
        }

        Ok(Rendered {
            html,
            setup,
            bundle,
        })
    }

    /// Render `request` to HTML.
    pub async fn html(&self, request: RenderRequest) -> Result<String, GatewayError> {
        self.render(request).await.map(|rendered| rendered.html)
    }

    // === Dispatch ===

    /// Answer one request. Returns an error only when a failure was reported
    /// with no error listener subscribed.
    pub async fn handle(&self, ctx: RequestContext) -> Result<Response, UnhandledError> {
        let Some(route) = self.inner.routes.get(&ctx.path) else {
            tracing::debug!(path = %ctx.path, "no route");
            return Ok(StatusCode::NOT_FOUND.into_response());
        };
        if ctx.method != Method::GET && ctx.method != Method::HEAD {
            return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
        }

        let response = ResponseWriter::new();
        match route {
            Route::Page(options) => self.dispatch(ctx, &options, &response).await?,
            Route::Bundle(target) => {
                let logger = self.request_logger(&ctx);
                self.serve_bundle(&target, &response, &logger).await?
            }
        }
        Ok(response.into_response())
    }

    /// Resolve options, render and write the page into `response`.
    pub async fn dispatch(
        &self,
        ctx: RequestContext,
        options: &RouteOptions,
        response: &ResponseWriter,
    ) -> Result<(), UnhandledError> {
        let logger = self.request_logger(&ctx);
        let mut state = DispatchState::new();

        let request = match options {
            RouteOptions::Static(request) => {
                state.advance(DispatchPhase::Resolving);
                request.clone()
            }
            RouteOptions::Deferred(resolver) => {
                state.advance(DispatchPhase::WaitingForCallback);
                logger.debug("waiting for deferred options");
                let delivery = wait_for_options(
                    Arc::clone(resolver),
                    ctx,
                    response.clone(),
                    self.inner.config.deferred_timeout(),
                )
                .await;
                match delivery {
                    Delivery::Options(request) => {
                        state.advance(DispatchPhase::Resolving);
                        request
                    }
                    Delivery::Answered => {
                        state.advance(DispatchPhase::Responding);
                        state.advance(DispatchPhase::Terminal);
                        logger.info("resolver answered the request");
                        return Ok(());
                    }
                    Delivery::Failed(error) => {
                        state.advance(DispatchPhase::Responding);
                        logger
                            .event(LogLevel::Warn, "deferred options not delivered")
                            .field("error", error.to_string())
                            .emit();
                        let outcome = self.inner.errors.report(error, Some(response));
                        state.advance(DispatchPhase::Terminal);
                        return outcome;
                    }
                }
            }
        };

        let result = self.render(request).await;
        state.advance(DispatchPhase::Responding);

        let outcome = match result {
            Ok(rendered) => {
                let bytes = rendered.html.len() as u64;
                response.send_html(StatusCode::OK, rendered.html);
                logger
                    .event(LogLevel::Info, "rendered")
                    .field("component", rendered.setup.component_path.display().to_string())
                    .field("bytes", bytes)
                    .duration_ms("render_ms", state.timing().elapsed())
                    .emit();
                Ok(())
            }
            Err(error) => {
                logger
                    .event(LogLevel::Error, "render failed")
                    .field("error", error.to_string())
                    .emit();
                self.inner.errors.report(error, Some(response))
            }
        };
        state.advance(DispatchPhase::Terminal);
        outcome
    }

    fn request_logger(&self, ctx: &RequestContext) -> RequestLogger {
        RequestLogger::new(ctx.request_id.clone())
            .with_workload(self.inner.workload.as_str())
            .with_route(ctx.path.as_str())
    }

    async fn serve_bundle(
        &self,
        target: &BundleTarget,
        response: &ResponseWriter,
        logger: &RequestLogger,
    ) -> Result<(), UnhandledError> {
        match self.inner.bundles.build(target).await {
            Ok((bytes, status)) => {
                response.set_header(BUNDLE_CACHE_HEADER, HeaderValue::from_static(status.as_str()));
                logger
                    .event(LogLevel::Debug, "bundle served")
                    .field("cache", status.as_str())
                    .field("bytes", bytes.len() as u64)
                    .emit();
                response.send(StatusCode::OK, JAVASCRIPT, bytes.as_ref().clone());
                Ok(())
            }
            Err(err) => {
                logger
                    .event(LogLevel::Warn, "bundle build failed")
                    .field("component", target.component_path.display().to_string())
                    .field("error", err.to_string())
                    .emit();
                self.inner
                    .errors
                    .report(GatewayError::from(err), Some(response))
            }
        }
    }

    // === Serving ===

    /// An axum router answering every path through this gateway.
    ///
    /// Used on its own, unhandled errors answer `500`; only [`serve`](Self::serve)
    /// shuts down on them.
    pub fn router(&self) -> Router {
        self.router_with(None)
    }

    fn router_with(&self, fatal: Option<mpsc::Sender<UnhandledError>>) -> Router {
        Router::new().fallback(handle_request).with_state(AppState {
            gateway: self.clone(),
            fatal,
        })
    }

    /// Serve on `listener` until an unhandled error occurs.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServeError> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve on `listener` until `signal` resolves or an unhandled error
    /// occurs. An unhandled error is returned after in-flight requests finish.
    pub async fn serve_with_shutdown<S>(
        &self,
        listener: TcpListener,
        signal: S,
    ) -> Result<(), ServeError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<UnhandledError>(1);
        let fatal: Arc<Mutex<Option<UnhandledError>>> = Arc::default();
        let slot = Arc::clone(&fatal);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, workload = %self.inner.workload, "gateway listening");
        }

        axum::serve(listener, self.router_with(Some(fatal_tx)))
            .with_graceful_shutdown(async move {
                tokio::select! {
                    Some(err) = fatal_rx.recv() => {
                        tracing::error!(error = %err, "shutting down after unhandled error");
                        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                    }
                    _ = signal => {
                        tracing::info!("shutting down");
                    }
                }
            })
            .await?;

        let unhandled = fatal.lock().unwrap_or_else(PoisonError::into_inner).take();
        match unhandled {
            Some(err) => Err(ServeError::Unhandled(err)),
            None => Ok(()),
        }
    }

    /// Bind `addr` and [`serve`](Self::serve).
    pub async fn listen(&self, addr: impl ToSocketAddrs) -> Result<(), ServeError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("workload", &self.inner.workload)
            .field("routes", &self.inner.routes.len())
            .field("bundles", &self.inner.bundles.registered_count())
            .field("errors", &self.inner.errors)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct AppState {
    gateway: Gateway,
    fatal: Option<mpsc::Sender<UnhandledError>>,
}

async fn handle_request(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    match state.gateway.handle(ctx).await {
        Ok(response) => response,
        Err(unhandled) => {
            if let Some(fatal) = &state.fatal {
                // A full channel means shutdown is already underway.
                let _ = fatal.try_send(unhandled);
            }
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
