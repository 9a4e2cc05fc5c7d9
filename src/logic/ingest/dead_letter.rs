//! Dead-letter queue
//!
//! Bounded parking area for events the pipeline could not persist:
//! validation rejects and retry-exhausted failures. Entries keep the full
//! event so an operator can replay them once the underlying fault clears.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::warn;

use super::event::VerdictEvent;

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: VerdictEvent,
    pub reason: String,
    /// When the event was parked, milliseconds since epoch
    pub parked_at: i64,
}

pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Park an event. Beyond capacity the oldest entry is dropped.
    pub fn push(&self, event: VerdictEvent, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(case = %event.case_key(), %reason, "dead-lettering verdict event");

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            if let Some(dropped) = entries.pop_front() {
                warn!(
                    case = %dropped.event.case_key(),
                    "dead-letter queue full; dropping oldest entry"
                );
            }
        }
        entries.push_back(DeadLetter {
            event,
            reason,
            parked_at: crate::logic::now_ms(),
        });
    }

    /// Take everything currently parked, oldest first.
    pub fn drain(&self) -> Vec<DeadLetter> {
        self.entries.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::admission::Action;

    fn event(ip: &str) -> VerdictEvent {
        VerdictEvent {
            ts: 1_000,
            ip: ip.into(),
            asn: 64496,
            country: String::new(),
            user_agent: String::new(),
            path: "/".into(),
            method: "GET".into(),
            action: Action::Allow,
            score: 0.0,
            hits: 1,
            zone: "example.com".into(),
            colo: String::new(),
        }
    }

    #[test]
    fn test_push_and_drain_preserve_order() {
        let queue = DeadLetterQueue::new(8);
        queue.push(event("203.0.113.1"), "first");
        queue.push(event("203.0.113.2"), "second");
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0].reason, "first");
        assert_eq!(drained[1].reason, "second");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let queue = DeadLetterQueue::new(2);
        queue.push(event("203.0.113.1"), "a");
        queue.push(event("203.0.113.2"), "b");
        queue.push(event("203.0.113.3"), "c");

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event.ip, "203.0.113.2");
        assert_eq!(drained[1].event.ip, "203.0.113.3");
    }
}
