//! Event Bus for dispatching events to listeners
//!
//! Two kinds of consumers are supported:
//! - listeners registered per event type with [`EventBus::subscribe`] run
//!   synchronously, in subscription order, before `publish` returns;
//! - stream subscribers from [`EventBus::subscribe_stream`] receive every
//!   event through a tokio broadcast channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::types::{Event, EventMessage};

const DEFAULT_CAPACITY: usize = 1024;

/// Synchronous event consumer
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Event bus shared by publishers and listeners
#[derive(Clone)]
pub struct EventBus {
    listeners: Arc<DashMap<String, Vec<Arc<dyn EventListener>>>>,
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            listeners: Arc::new(DashMap::new()),
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register `listener` for events named `event_type`.
    pub fn subscribe<L>(&self, event_type: &str, listener: L)
    where
        L: EventListener + 'static,
    {
        let mut entry = self.listeners.entry(event_type.to_string()).or_default();
        entry.push(Arc::new(listener));
        debug!(event_type, listeners = entry.len(), "Listener subscribed");
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, |l| l.len())
    }

    /// Dispatch `event` to its listeners, then to stream subscribers.
    ///
    /// Returns the number of synchronous listeners that were invoked.
    pub fn publish(&self, event: Event) -> usize {
        let event_type = event.event_type();

        // Snapshot so listeners may subscribe while being dispatched to.
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .get(event_type)
            .map(|l| l.value().clone())
            .unwrap_or_default();

        for listener in &listeners {
            listener.on_event(&event);
        }

        let message = EventMessage::new(event);
        match self.sender.send(message) {
            Ok(count) => {
                debug!(
                    event_type,
                    listeners = listeners.len(),
                    subscribers = count,
                    "Event published"
                );
            }
            Err(_) => {
                debug!(
                    event_type,
                    listeners = listeners.len(),
                    "Event published (no stream subscribers)"
                );
            }
        }

        listeners.len()
    }

    pub fn subscribe_stream(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        let count = self.subscriber_count.load(Ordering::SeqCst);
        info!(total = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!(remaining = prev - 1, "Event subscriber disconnected");
    }
}

/// Shared event bus type
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{FormData, PostEvent, UserDeletedEvent};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    fn post_event() -> PostEvent {
        let mut data = FormData::new();
        data.insert("title".into(), json!("Hello"));
        PostEvent::new(data)
    }

    #[test]
    fn listeners_run_before_publish_returns() {
        let bus = EventBus::new();
        let seen: Arc<Mutex<Vec<FormData>>> = Arc::default();

        let sink = seen.clone();
        bus.subscribe(PostEvent::POST_DATA, move |event: &Event| {
            if let Event::PostSubmitted(post) = event {
                sink.lock().unwrap().push(post.form_data().clone());
            }
        });

        let event = post_event();
        let invoked = bus.publish(Event::PostSubmitted(event.clone()));

        assert_eq!(invoked, 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("title"), Some(&json!("Hello")));
        assert_eq!(event.form_data().get("title"), Some(&json!("Hello")));
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let bus = EventBus::new();
        let order: Arc<Mutex<Vec<u8>>> = Arc::default();

        for n in 1..=3u8 {
            let order = order.clone();
            bus.subscribe(PostEvent::POST_DATA, move |_: &Event| {
                order.lock().unwrap().push(n);
            });
        }

        bus.publish(Event::PostSubmitted(post_event()));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn listeners_only_see_their_event_type() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.subscribe("bolt.user_deleted", move |_: &Event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(Event::PostSubmitted(post_event())), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.publish(Event::UserDeleted(UserDeletedEvent {
            user_id: 1,
            timestamp: Utc::now(),
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let bus = EventBus::new();
        let inner = bus.clone();
        bus.subscribe(PostEvent::POST_DATA, move |_: &Event| {
            inner.subscribe(PostEvent::POST_DATA, |_: &Event| {});
        });

        assert_eq!(bus.publish(Event::PostSubmitted(post_event())), 1);
        assert_eq!(bus.listener_count(PostEvent::POST_DATA), 2);
    }

    #[test]
    fn publish_without_listeners_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(Event::PostSubmitted(post_event())), 0);
    }

    #[tokio::test]
    async fn stream_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe_stream();

        bus.publish(Event::PostSubmitted(post_event()));

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            subscriber.recv(),
        )
        .await
        .expect("Timeout")
        .expect("No message");

        assert_eq!(received.event.event_type(), "bolt.post_data");
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe_stream();
        assert_eq!(bus.subscriber_count(), 1);

        let _sub2 = bus.subscribe_stream();
        assert_eq!(bus.subscriber_count(), 2);

        drop(_sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
