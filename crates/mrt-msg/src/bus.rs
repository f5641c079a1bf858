//! ---
//! mrt_section: "02-messaging-ipc-data-model"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Notification bus message shapes and in-process transport."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{InboundEvent, Message, MessagePayload, OutboundEvent};

const DEFAULT_CAPACITY: usize = 1024;

/// Snapshot of bus counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusMetrics {
    /// Messages handed to the bus.
    pub published: u64,
    /// Messages published while nobody was subscribed.
    pub undelivered: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    undelivered: AtomicU64,
}

/// In-process publish/subscribe bus.
///
/// Upstream notifications and tracker announcements travel on separate
/// channels, so announcements never take capacity from unread inbound
/// messages. Publishing never fails: a message nobody listens to is counted
/// as undelivered and discarded. A subscriber lags and loses the oldest
/// messages of its channel once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct MessageBus {
    inbound: broadcast::Sender<Message>,
    outbound: broadcast::Sender<Message>,
    counters: Arc<Counters>,
}

impl MessageBus {
    /// Create a bus retaining at most `capacity` unread messages per subscriber and channel.
    pub fn new(capacity: usize) -> Self {
        let (inbound, _) = broadcast::channel(capacity.max(1));
        let (outbound, _) = broadcast::channel(capacity.max(1));
        Self {
            inbound,
            outbound,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Receive every upstream notification published from now on.
    pub fn subscribe_inbound(&self) -> broadcast::Receiver<Message> {
        self.inbound.subscribe()
    }

    /// Receive every tracker announcement published from now on.
    pub fn subscribe_outbound(&self) -> broadcast::Receiver<Message> {
        self.outbound.subscribe()
    }

    /// Number of live subscribers across both channels.
    pub fn receiver_count(&self) -> usize {
        self.inbound.receiver_count() + self.outbound.receiver_count()
    }

    /// Publish a payload on its channel, returning the envelope identifier.
    pub fn publish(&self, payload: MessagePayload) -> Uuid {
        let sender = match &payload {
            MessagePayload::Inbound(_) => &self.inbound,
            MessagePayload::Outbound(_) => &self.outbound,
        };
        let message = Message::new(payload);
        let id = message.id;
        let kind = message.kind();
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        if sender.send(message).is_err() {
            self.counters.undelivered.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target: "mrt::bus", %id, kind, "no subscribers for message");
        }
        id
    }

    /// Publish an upstream notification.
    pub fn publish_inbound(&self, event: InboundEvent) -> Uuid {
        self.publish(MessagePayload::Inbound(event))
    }

    /// Publish a tracker announcement.
    pub fn announce(&self, event: OutboundEvent) -> Uuid {
        self.publish(MessagePayload::Outbound(event))
    }

    /// Current counter values.
    pub fn metrics(&self) -> BusMetrics {
        BusMetrics {
            published: self.counters.published.load(Ordering::Relaxed),
            undelivered: self.counters.undelivered.load(Ordering::Relaxed),
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutboundKind, SituationalAwarenessState};

    #[test]
    fn publish_without_subscribers_is_counted_not_failed() {
        let bus = MessageBus::default();
        bus.announce(OutboundEvent::new(
            "m-1",
            OutboundKind::Initialized,
            serde_json::Value::Null,
        ));
        assert_eq!(
            bus.metrics(),
            BusMetrics {
                published: 1,
                undelivered: 1
            }
        );
    }

    #[tokio::test]
    async fn channels_are_separated_by_direction() {
        let bus = MessageBus::new(8);
        let mut inbound = bus.subscribe_inbound();
        let mut outbound = bus.subscribe_outbound();
        bus.publish_inbound(InboundEvent::SituationalAwarenessComplete(
            SituationalAwarenessState::default(),
        ));
        bus.announce(OutboundEvent::new(
            "m-1",
            OutboundKind::Cleanup,
            serde_json::Value::Null,
        ));

        assert_eq!(inbound.recv().await.unwrap().kind(), "inbound");
        assert!(inbound.try_recv().is_err());
        assert_eq!(
            outbound.recv().await.unwrap().as_outbound().map(|event| event.kind),
            Some(OutboundKind::Cleanup)
        );
        assert_eq!(bus.receiver_count(), 2);
        assert_eq!(bus.metrics().undelivered, 0);
    }

    #[test]
    fn announcements_do_not_evict_unread_inbound() {
        let bus = MessageBus::new(2);
        let mut inbound = bus.subscribe_inbound();
        let _outbound = bus.subscribe_outbound();
        bus.publish_inbound(InboundEvent::SituationalAwarenessComplete(
            SituationalAwarenessState::default(),
        ));
        for _ in 0..16 {
            bus.announce(OutboundEvent::new(
                "m-1",
                OutboundKind::IndexUpdated,
                serde_json::Value::Null,
            ));
        }
        let message = inbound.try_recv().unwrap();
        assert!(message.as_inbound().is_some());
    }
}
