//! Synchronous fan-out of raw frames to subscribers
//!
//! Delivery is in attachment order and not isolated: the first subscriber
//! that fails stops delivery of that message to the ones after it, and its
//! error is returned to the caller.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::SubscriberError;
use crate::traits::Subscriber;

/// Ordered, duplicate-free subscriber registry
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Subscriber>>,
}

/// Identity is the allocation, not the value
fn same_subscriber(a: &Arc<dyn Subscriber>, b: &Arc<dyn Subscriber>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber unless it is already attached
    pub fn attach(&mut self, subscriber: Arc<dyn Subscriber>) {
        if self.contains(&subscriber) {
            info!(subscriber = subscriber.name(), "Subscriber already attached");
            return;
        }
        info!(subscriber = subscriber.name(), "Subscriber attached");
        self.subscribers.push(subscriber);
    }

    /// Remove a subscriber if present
    pub fn detach(&mut self, subscriber: &Arc<dyn Subscriber>) {
        match self
            .subscribers
            .iter()
            .position(|s| same_subscriber(s, subscriber))
        {
            Some(idx) => {
                self.subscribers.remove(idx);
                info!(subscriber = subscriber.name(), "Subscriber detached");
            }
            None => {
                warn!(
                    subscriber = subscriber.name(),
                    "Subscriber not found, could not detach"
                );
            }
        }
    }

    /// Deliver `message` to every attached subscriber in order
    pub fn notify(&self, message: &str) -> Result<(), SubscriberError> {
        for subscriber in &self.subscribers {
            subscriber.update(message)?;
        }
        Ok(())
    }

    pub fn contains(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        self.subscribers
            .iter()
            .any(|s| same_subscriber(s, subscriber))
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSubscriber {
        messages: Mutex<Vec<String>>,
    }

    impl Subscriber for RecordingSubscriber {
        fn update(&self, message: &str) -> Result<(), SubscriberError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    /// Appends its tag to a shared log so ordering across subscribers is visible
    struct TaggedSubscriber {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Subscriber for TaggedSubscriber {
        fn update(&self, message: &str) -> Result<(), SubscriberError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.tag, message));
            Ok(())
        }
    }

    struct FailingSubscriber;

    impl Subscriber for FailingSubscriber {
        fn update(&self, _message: &str) -> Result<(), SubscriberError> {
            Err(SubscriberError::Failed("boom".to_string()))
        }
    }

    #[test]
    fn test_new_bus_is_empty() {
        let bus = EventBus::new();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut bus = EventBus::new();
        let sub: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());

        bus.attach(Arc::clone(&sub));
        bus.attach(Arc::clone(&sub));

        assert_eq!(bus.len(), 1);
        assert!(bus.contains(&sub));
    }

    #[test]
    fn test_equal_values_are_distinct_subscribers() {
        let mut bus = EventBus::new();
        let a: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());
        let b: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());

        bus.attach(a);
        bus.attach(b);

        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_detach() {
        let mut bus = EventBus::new();
        let sub: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());

        bus.attach(Arc::clone(&sub));
        bus.detach(&sub);

        assert!(!bus.contains(&sub));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_detach_unknown_is_noop() {
        let mut bus = EventBus::new();
        let attached: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());
        let stranger: Arc<dyn Subscriber> = Arc::new(RecordingSubscriber::default());

        bus.attach(Arc::clone(&attached));
        bus.detach(&stranger);

        assert_eq!(bus.len(), 1);
        assert!(bus.contains(&attached));
    }

    #[test]
    fn test_notify_delivers_exact_message_once() {
        let mut bus = EventBus::new();
        let sub = Arc::new(RecordingSubscriber::default());
        bus.attach(sub.clone());

        bus.notify("Test notification").unwrap();

        assert_eq!(*sub.messages.lock().unwrap(), vec!["Test notification"]);
    }

    #[test]
    fn test_notify_preserves_attachment_order() {
        let mut bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            bus.attach(Arc::new(TaggedSubscriber {
                tag,
                log: Arc::clone(&log),
            }));
        }

        bus.notify("m1").unwrap();
        bus.notify("m2").unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:m1", "b:m1", "c:m1", "a:m2", "b:m2", "c:m2"]
        );
    }

    #[test]
    fn test_failure_stops_delivery_to_later_subscribers() {
        let mut bus = EventBus::new();
        let before = Arc::new(RecordingSubscriber::default());
        let after = Arc::new(RecordingSubscriber::default());
        bus.attach(before.clone());
        bus.attach(Arc::new(FailingSubscriber));
        bus.attach(after.clone());

        let result = bus.notify("frame");

        assert!(matches!(result, Err(SubscriberError::Failed(_))));
        assert_eq!(before.messages.lock().unwrap().len(), 1);
        assert!(after.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notify_after_detach_skips_subscriber() {
        let mut bus = EventBus::new();
        let kept = Arc::new(RecordingSubscriber::default());
        let removed = Arc::new(RecordingSubscriber::default());
        let removed_dyn: Arc<dyn Subscriber> = removed.clone();
        bus.attach(kept.clone());
        bus.attach(Arc::clone(&removed_dyn));

        bus.detach(&removed_dyn);
        bus.notify("x").unwrap();

        assert_eq!(kept.messages.lock().unwrap().len(), 1);
        assert!(removed.messages.lock().unwrap().is_empty());
    }
}
