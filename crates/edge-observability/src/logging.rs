//! Request-scoped structured logging.

use std::time::{Duration, Instant};

use edge_core::RequestId;
use serde_json::{Map, Value};

// `tracing` needs the level as a constant at each callsite.
macro_rules! emit_at {
    ($level:expr, $record:expr) => {
        tracing::event!(
            $level,
            request_id = %$record.request_id,
            workload = %$record.workload,
            route = %$record.route,
            elapsed_us = $record.elapsed_us,
            fields = %$record.fields,
            "{}",
            $record.message
        )
    };
}

/// Severity of a request event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Logger bound to one request.
///
/// Every event carries the request id, workload, route and the time since
/// the request started. Events go through `tracing`; the installed
/// subscriber decides the output format.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: RequestId,
    workload: Option<String>,
    route: Option<String>,
    started: Instant,
}

impl RequestLogger {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            workload: None,
            route: None,
            started: Instant::now(),
        }
    }

    pub fn with_workload(mut self, workload: impl Into<String>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Time since the logger was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn debug(&self, message: &str) {
        self.event(LogLevel::Debug, message).emit();
    }

    pub fn info(&self, message: &str) {
        self.event(LogLevel::Info, message).emit();
    }

    /// Start an event that can carry extra fields.
    pub fn event(&self, level: LogLevel, message: impl Into<String>) -> LogEvent<'_> {
        LogEvent {
            logger: self,
            level,
            message: message.into(),
            fields: Map::new(),
        }
    }
}

/// An event under construction.
#[must_use = "an event is only logged once `emit` is called"]
pub struct LogEvent<'a> {
    logger: &'a RequestLogger,
    level: LogLevel,
    message: String,
    fields: Map<String, Value>,
}

impl LogEvent<'_> {
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Add a duration in whole milliseconds.
    pub fn duration_ms(self, key: &str, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.field(key, millis)
    }

    pub fn emit(self) {
        let record = self.into_record();
        match record.level {
            LogLevel::Debug => emit_at!(tracing::Level::DEBUG, record),
            LogLevel::Info => emit_at!(tracing::Level::INFO, record),
            LogLevel::Warn => emit_at!(tracing::Level::WARN, record),
            LogLevel::Error => emit_at!(tracing::Level::ERROR, record),
        }
    }

    fn into_record(self) -> Record {
        let fields = if self.fields.is_empty() {
            String::new()
        } else {
            Value::Object(self.fields).to_string()
        };
        Record {
            level: self.level,
            message: self.message,
            request_id: self.logger.request_id.to_string(),
            workload: self.logger.workload.clone().unwrap_or_default(),
            route: self.logger.route.clone().unwrap_or_default(),
            elapsed_us: u64::try_from(self.logger.elapsed().as_micros()).unwrap_or(u64::MAX),
            fields,
        }
    }
}

struct Record {
    level: LogLevel,
    message: String,
    request_id: String,
    workload: String,
    route: String,
    elapsed_us: u64,
    fields: String,
}
