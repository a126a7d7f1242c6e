//! Gateway-owned error reporting policy.

use std::sync::{Arc, PoisonError, RwLock};

use edge_core::{Environment, GatewayError, UnhandledError};
use edge_render::escape_html;

use crate::response::ResponseWriter;

/// Receives every error the gateway reports.
///
/// Listeners may commit the response themselves; if none does, the bus
/// answers with a 500.
pub trait ErrorListener: Send + Sync + 'static {
    fn on_error(&self, error: &Arc<GatewayError>, response: Option<&ResponseWriter>);
}

impl<F> ErrorListener for F
where
    F: Fn(&Arc<GatewayError>, Option<&ResponseWriter>) + Send + Sync + 'static,
{
    fn on_error(&self, error: &Arc<GatewayError>, response: Option<&ResponseWriter>) {
        self(error, response)
    }
}

/// Routes reported errors to listeners.
///
/// With no listener registered a report is fatal and comes back as
/// [`UnhandledError`].
pub struct ErrorBus {
    listeners: RwLock<Vec<Arc<dyn ErrorListener>>>,
    environment: Environment,
    default_message: String,
}

impl ErrorBus {
    pub fn new(environment: Environment, default_message: impl Into<String>) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            environment,
            default_message: default_message.into(),
        }
    }

    /// Add a listener. Listeners are called in subscription order.
    pub fn subscribe(&self, listener: impl ErrorListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Report `error`, optionally with the response of the failed request.
    pub fn report(
        &self,
        error: impl Into<Arc<GatewayError>>,
        response: Option<&ResponseWriter>,
    ) -> Result<(), UnhandledError> {
        let error = error.into();
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if listeners.is_empty() {
            tracing::error!(error = %error.detail(), "unhandled gateway error");
            return Err(UnhandledError(error));
        }

        tracing::warn!(error = %error, listeners = listeners.len(), "gateway error");
        for listener in &listeners {
            listener.on_error(&error, response);
        }

        if let Some(response) = response {
            if !response.is_sent() {
                response.send_html(error.status(), self.error_body(&error));
            }
        }
        Ok(())
    }

    /// Body of the default error page.
    pub fn error_body(&self, error: &GatewayError) -> String {
        if self.environment.exposes_errors() {
            format!(
                "<h3>{}<br>{}</h3>",
                escape_html(&error.to_string()),
                escape_html(&error.detail()).replace('\n', "<br>")
            )
        } else {
            format!("<h3>{}</h3>", escape_html(&self.default_message))
        }
    }
}

impl std::fmt::Debug for ErrorBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBus")
            .field("listeners", &self.listener_count())
            .field("environment", &self.environment)
            .field("default_message", &self.default_message)
            .finish()
    }
}
