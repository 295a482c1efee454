use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
/// Event bus for pub/sub messaging
///
/// Allows any part of the application to subscribe to sound events, either
/// all of them or a single topic.
use std::sync::Arc;

use super::events::{Event, Topic};

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// Event subscriber
struct Subscriber {
    id: SubscriberId,
    topic: Option<Topic>,
    sender: Sender<Event>,
}

impl Subscriber {
    fn wants(&self, event: &Event) -> bool {
        self.topic.map_or(true, |topic| topic == event.topic())
    }
}

/// Event bus for broadcasting events to subscribers
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    fn register(&self, topic: Option<Topic>) -> (Receiver<Event>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        let subscriber = Subscriber {
            id,
            topic,
            sender: tx,
        };

        self.subscribers.write().push(subscriber);

        (rx, id)
    }

    /// Subscribe to every event, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<Event>, SubscriberId) {
        self.register(None)
    }

    /// Subscribe to the events of one topic
    pub fn subscribe_topic(&self, topic: Topic) -> (Receiver<Event>, SubscriberId) {
        self.register(Some(topic))
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish an event to all interested subscribers
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.read();

        for subscriber in subscribers.iter().filter(|s| s.wants(&event)) {
            // If send fails, subscriber channel is closed - that's ok
            let _ = subscriber.sender.try_send(event.clone());
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Clear all subscribers
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}
