//! Route options and deferred option resolution.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use edge_core::{DispatchPhase, GatewayError, RenderRequest, RequestContext, TimingContext};
use tokio::sync::oneshot;

use crate::response::ResponseWriter;

/// Produces render options for a request, possibly after async work.
///
/// The resolver delivers options by calling [`Done::call`]. It may instead
/// answer the request itself through the response and drop `done`.
#[async_trait]
pub trait ResolveOptions: Send + Sync + 'static {
    async fn resolve(&self, ctx: RequestContext, response: ResponseWriter, done: Done);
}

#[async_trait]
impl<F, Fut> ResolveOptions for F
where
    F: Fn(RequestContext, ResponseWriter, Done) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn resolve(&self, ctx: RequestContext, response: ResponseWriter, done: Done) {
        self(ctx, response, done).await
    }
}

/// How a route obtains its render options.
#[derive(Clone)]
pub enum RouteOptions {
    /// Fixed options, merged over the configured defaults per request.
    Static(RenderRequest),
    /// Options computed per request.
    Deferred(Arc<dyn ResolveOptions>),
}

impl RouteOptions {
    /// Options delivered by `resolver` for each request.
    pub fn deferred(resolver: impl ResolveOptions) -> Self {
        Self::Deferred(Arc::new(resolver))
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::Static(RenderRequest::default())
    }
}

impl From<RenderRequest> for RouteOptions {
    fn from(request: RenderRequest) -> Self {
        Self::Static(request)
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(request) => f.debug_tuple("Static").field(request).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Single-use completion handle handed to a deferred resolver.
///
/// Clones share one slot: the first [`call`](Self::call) across all clones
/// delivers the options, every later call returns `false`.
#[derive(Clone)]
pub struct Done {
    slot: Arc<Mutex<Option<oneshot::Sender<RenderRequest>>>>,
}

impl Done {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<RenderRequest>) {
        let (tx, rx) = oneshot::channel();
        let done = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (done, rx)
    }

    /// Deliver `options`. Returns false if options were already delivered or
    /// the request is no longer waiting.
    pub fn call(&self, options: RenderRequest) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => tx.send(options).is_ok(),
            None => {
                tracing::debug!("deferred options already delivered, ignoring");
                false
            }
        }
    }

    /// Whether options were delivered.
    pub fn is_called(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("called", &self.is_called())
            .finish()
    }
}

/// Outcome of waiting for a deferred resolver.
#[derive(Debug)]
pub enum Delivery {
    /// Options arrived.
    Options(RenderRequest),
    /// The resolver answered the request itself.
    Answered,
    /// No options and no response.
    Failed(GatewayError),
}

/// Run `resolver` on its own task and wait for it to deliver options.
///
/// Without a timeout the wait ends only when options arrive or every `Done`
/// clone is dropped.
pub async fn wait_for_options(
    resolver: Arc<dyn ResolveOptions>,
    ctx: RequestContext,
    response: ResponseWriter,
    timeout: Option<Duration>,
) -> Delivery {
    let (done, rx) = Done::channel();
    let task = tokio::spawn({
        let response = response.clone();
        async move { resolver.resolve(ctx, response, done).await }
    });

    let received = match timeout {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                task.abort();
                return if response.is_sent() {
                    Delivery::Answered
                } else {
                    Delivery::Failed(GatewayError::DeferredTimeout(limit))
                };
            }
        },
        None => rx.await,
    };

    match received {
        Ok(options) => Delivery::Options(options),
        Err(_) if response.is_sent() => Delivery::Answered,
        Err(_) => Delivery::Failed(GatewayError::DeferredAbandoned),
    }
}

/// Phase tracker for one dispatched request.
#[derive(Debug)]
pub struct DispatchState {
    phase: DispatchPhase,
    timing: TimingContext,
}

impl DispatchState {
    pub fn new() -> Self {
        Self {
            phase: DispatchPhase::Idle,
            timing: TimingContext::new(),
        }
    }

    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }

    /// Move to `next`. Illegal transitions are logged and refused.
    pub fn advance(&mut self, next: DispatchPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(from = %self.phase, to = %next, "illegal dispatch transition");
            return false;
        }
        self.phase = next;
        self.timing.mark_phase(next);
        true
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}
