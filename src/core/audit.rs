//! Audit sink implementations.
//!
//! Records pool lifecycle events (registrations, task kills, commit
//! outcomes) for inspection by tests and operator tooling.

use std::collections::VecDeque;

use crate::config::PoolConfig;
use crate::util::clock::now_ms;

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Executor or task id the event concerns.
    pub subject_id: String,
    /// Scheduler on whose behalf the mutation ran; empty for executor-side
    /// operations.
    pub scheduler_id: String,
    /// Action taken (register, unregister, kill-task, commit-accept,
    /// commit-reject).
    pub action: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub payload: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Create a sink bounded by the configuration's `audit_buffer_size`.
    #[must_use]
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.audit_buffer_size)
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    event_id: impl Into<String>,
    subject_id: impl Into<String>,
    scheduler_id: impl Into<String>,
    action: impl Into<String>,
    payload: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: event_id.into(),
        subject_id: subject_id.into(),
        scheduler_id: scheduler_id.into(),
        action: action.into(),
        created_at_ms: now_ms(),
        payload,
    }
}
