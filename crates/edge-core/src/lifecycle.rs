//! Request lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Phases a request passes through inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPhase {
    /// Request received, route not yet inspected.
    Idle,
    /// Waiting for a deferred resolver to deliver options.
    WaitingForCallback,
    /// Options known; validating and rendering.
    Resolving,
    /// Writing the result or the error to the response.
    Responding,
    /// Response written.
    Terminal,
}

impl DispatchPhase {
    /// Stable name used in timing marks and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForCallback => "waiting_for_callback",
            Self::Resolving => "resolving",
            Self::Responding => "responding",
            Self::Terminal => "terminal",
        }
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance_to(&self, next: DispatchPhase) -> bool {
        use DispatchPhase::*;
        matches!(
            (self, next),
            (Idle, WaitingForCallback)
                | (Idle, Resolving)
                | (WaitingForCallback, Resolving)
                | (WaitingForCallback, Responding)
                | (Resolving, Responding)
                | (Responding, Terminal)
        )
    }
}

impl std::fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Mark entry into a dispatch phase.
    pub fn mark_phase(&mut self, phase: DispatchPhase) {
        self.mark(&format!("phase_{}", phase.as_str()));
    }

    /// Time from start to a mark, if recorded.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Time from start to entering a phase, if it was reached.
    pub fn time_to_phase(&self, phase: DispatchPhase) -> Option<Duration> {
        self.since_start(&format!("phase_{}", phase.as_str()))
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}
