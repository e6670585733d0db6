//! Diagnostic events
//!
//! The protocol engine reports every notable outcome (handshake results,
//! rejected frames, timeouts, decoded fixes) as a [`DiagnosticEvent`] handed
//! to a [`DiagnosticSink`]. What happens to the events is up to the sink:
//! [`TracingSink`] forwards them to `tracing`, [`DiagnosticLog`] keeps a
//! bounded history for later presentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Default number of events retained by a [`DiagnosticLog`]
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Expected progress
    Info,
    /// The receiver answered, but not usefully
    Warning,
    /// The link or the receiver failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single diagnostic statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// How serious the outcome is
    pub severity: Severity,
    /// Human readable description
    pub message: String,
}

impl DiagnosticEvent {
    /// Create an event
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Informational event
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Warning event
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Receiver of diagnostic events
pub trait DiagnosticSink: Send + Sync {
    /// Accept one event
    fn emit(&self, event: DiagnosticEvent);
}

impl<F> DiagnosticSink for F
where
    F: Fn(DiagnosticEvent) + Send + Sync,
{
    fn emit(&self, event: DiagnosticEvent) {
        self(event)
    }
}

/// Forwards events to `tracing` at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        match event.severity {
            Severity::Info => tracing::info!(target: "dgps", "{}", event.message),
            Severity::Warning => tracing::warn!(target: "dgps", "{}", event.message),
            Severity::Error => tracing::error!(target: "dgps", "{}", event.message),
        }
    }
}

/// An event with the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// When the event reached the log
    pub timestamp: DateTime<Utc>,
    /// The event itself
    pub event: DiagnosticEvent,
}

/// Bounded in-memory history of events; the oldest entry is dropped once
/// the capacity is reached
#[derive(Debug)]
pub struct DiagnosticLog {
    capacity: usize,
    entries: Mutex<VecDeque<LoggedEvent>>,
}

impl DiagnosticLog {
    /// Log retaining [`DEFAULT_LOG_CAPACITY`] events
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Log retaining at most `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been logged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the retained events, oldest first
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Most recent event, if any
    pub fn latest(&self) -> Option<LoggedEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Remove and return all retained events, oldest first
    pub fn drain(&self) -> Vec<LoggedEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn emit(&self, event: DiagnosticEvent) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LoggedEvent {
            timestamp: Utc::now(),
            event,
        });
    }
}
