//! In-memory event log of reconciliation outcomes.
//!
//! Stores per-object events capped at a configurable maximum (default 500)
//! with FIFO eviction. Uses `std::sync::RwLock` so it can be written from the
//! blocking pass workers and read from async code alike.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type, ordered by severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    Normal,
    Warning,
}

/// Why an event was recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventReason {
    /// An override payload failed to decode; the pass was aborted.
    RulesUnmarshalFailed,
    OutputUpdated,
    OutputUpdateFailed,
    /// The output target lacks the ownership marker and was left alone.
    OutputNotOwned,
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventReason::RulesUnmarshalFailed => "RulesUnmarshalFailed",
            EventReason::OutputUpdated => "OutputUpdated",
            EventReason::OutputUpdateFailed => "OutputUpdateFailed",
            EventReason::OutputNotOwned => "OutputNotOwned",
        };
        f.write_str(s)
    }
}

/// A single recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    /// `namespace/name` of the object the event is about.
    pub object: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub reason: EventReason,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Query parameters for filtering events.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Minimum event type (inclusive).
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub reason: Option<EventReason>,
    /// Maximum number of events to return (default 100).
    pub limit: Option<u32>,
}

/// Shared, capped, per-object event log. Clones share the same storage.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<RwLock<HashMap<String, VecDeque<Event>>>>,
    max_entries_per_object: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_object: max,
        }
    }

    pub fn record(
        &self,
        object: &str,
        event_type: EventType,
        reason: EventReason,
        message: impl Into<String>,
    ) {
        self.record_with_details(object, event_type, reason, message, None);
    }

    pub fn record_with_details(
        &self,
        object: &str,
        event_type: EventType,
        reason: EventReason,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let event = Event {
            timestamp: Utc::now(),
            object: object.to_string(),
            event_type,
            reason,
            message: message.into(),
            details,
        };

        let mut guard = self.entries.write().expect("event_log lock poisoned");
        let deque = guard.entry(object.to_string()).or_default();
        deque.push_back(event);
        while deque.len() > self.max_entries_per_object {
            deque.pop_front();
        }
    }

    /// Events for one object, newest-first.
    pub fn query(&self, object: &str, params: &EventQuery) -> Vec<Event> {
        let guard = self.entries.read().expect("event_log lock poisoned");
        let Some(deque) = guard.get(object) else {
            return Vec::new();
        };

        let min_type = params.event_type.unwrap_or(EventType::Normal);
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.event_type >= min_type)
            .filter(|e| params.reason.map_or(true, |r| e.reason == r))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Objects that have at least one event, sorted.
    pub fn objects(&self) -> Vec<String> {
        let guard = self.entries.read().expect("event_log lock poisoned");
        let mut objects: Vec<String> = guard.keys().cloned().collect();
        objects.sort();
        objects
    }

    pub fn clear(&self, object: &str) {
        self.entries
            .write()
            .expect("event_log lock poisoned")
            .remove(object);
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
