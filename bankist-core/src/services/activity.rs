//! Activity log - structured record of session actions
//!
//! Privacy-safe: entries carry the event name, the username involved and an
//! error message when the action failed. Amounts, balances and PINs are never
//! recorded. Every entry is also emitted through `tracing`.
//!
//! The log is kept in memory with a bounded capacity; the oldest entries are
//! dropped first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPACITY: usize = 1000;

/// An activity event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActivityEvent {
    /// Create a new event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            username: None,
            error_kind: None,
            error_message: None,
        }
    }

    /// Set the account the event concerns
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set error information
    pub fn with_error(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self.error_message = Some(message.into());
        self
    }
}

/// An entry as stored in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub username: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl ActivityEntry {
    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// In-memory activity log shared by the session service and the shell
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, VecDeque<ActivityEntry>> {
        // a panic mid-push cannot leave the deque half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an event
    pub fn log(&self, event: ActivityEvent) {
        match (&event.error_kind, &event.error_message) {
            (Some(kind), Some(message)) => tracing::warn!(
                event = %event.event,
                username = event.username.as_deref().unwrap_or("-"),
                kind = %kind,
                "{}",
                message
            ),
            _ => tracing::info!(
                event = %event.event,
                username = event.username.as_deref().unwrap_or("-"),
                "session activity"
            ),
        }

        let entry = ActivityEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            event: event.event,
            username: event.username,
            error_kind: event.error_kind,
            error_message: event.error_message,
        };

        let mut entries = self.entries();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Record a simple event with just a name
    pub fn log_event(&self, event: &str) {
        self.log(ActivityEvent::new(event))
    }

    /// Most recent entries first, up to `limit`
    pub fn get_recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.entries().iter().rev().take(limit).cloned().collect()
    }

    /// Most recent failed actions first, up to `limit`
    pub fn get_errors(&self, limit: usize) -> Vec<ActivityEntry> {
        self.entries()
            .iter()
            .rev()
            .filter(|e| e.is_error())
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    /// Drop every entry, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        removed
    }
}
