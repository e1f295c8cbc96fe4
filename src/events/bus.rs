//! # Event bus for instrument notifications.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so the synchronous state machine can
//! publish without awaiting, while async listeners (runtime fan-out, tests, host UI)
//! subscribe independently.
//!
//! ```text
//! Instrument ──┐
//! Registry   ──┼──► Bus ──► listener 1 (SubscriberSet fan-out)
//! SubscriberSet┘        └─► listener N (host UI, tests)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - Capacity is shared by all receivers; slow ones observe `RecvError::Lagged(n)`.
//! - A receiver only sees events sent after it subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for instrument events.
///
/// Cheap to clone; every clone publishes into the same channel. Callers own the
/// bus and hand it to the instruments they build.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(Event::new(EventKind::Deployed));
    }

    #[test]
    fn test_receivers_see_later_events_only() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::Deployed));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::Retracted));

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Retracted);
        assert!(rx.try_recv().is_err());
    }
}
