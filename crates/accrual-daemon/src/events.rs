//! Event emission system.
//!
//! Committed engine notifications are pushed to subscribers as JSON-RPC
//! notifications. Each subscriber has an independent buffer; a lagging
//! subscriber loses the oldest events, never the engine's progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use accrual_types::events::AccrualEvent;

use crate::clock::unix_now;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number assigned by the bus.
    pub seq: u64,
    /// Event type name (e.g. "rewards_paid", "daemon_started").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only these event types.
    pub event_types: Option<Vec<String>>,
    /// Only events concerning this account (hex).
    pub account: Option<String>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit a daemon-level event.
    pub fn emit(&self, event_type: &str, payload: serde_json::Value) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        // No subscribers is fine.
        let _ = self.sender.send(Event {
            seq,
            event_type: event_type.to_string(),
            timestamp: unix_now(),
            payload,
        });
    }

    /// Emit a committed engine notification.
    pub fn emit_accrual(&self, event: &AccrualEvent) {
        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        self.emit(event.event_type().as_str(), payload);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == &event.event_type) {
                return false;
            }
        }

        if let Some(ref account) = self.account {
            let subject = event
                .payload
                .get("participant")
                .or_else(|| event.payload.get("account"))
                .and_then(|v| v.as_str());
            match subject {
                Some(s) if s.eq_ignore_ascii_case(account) => {}
                _ => return false,
            }
        }

        true
    }
}
