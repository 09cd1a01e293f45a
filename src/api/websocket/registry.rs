//! Subscriber registry
//!
//! The authoritative set of live push subscribers. Every structural access
//! (register, unregister, snapshot) goes through one mutex, and the mutex is
//! never held while writing to a subscriber.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::subscriber::Subscriber;

/// Registry-issued identity of one subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Set of currently connected subscribers
pub struct SubscriberRegistry {
    subscribers: Mutex<BTreeMap<SubscriberId, Arc<dyn Subscriber>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a subscriber; it receives every broadcast issued after this returns
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().insert(id, subscriber);
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }

    /// Copy of the current membership in registration order
    pub fn snapshot(&self) -> Vec<(SubscriberId, Arc<dyn Subscriber>)> {
        self.subscribers
            .lock()
            .iter()
            .map(|(id, subscriber)| (*id, Arc::clone(subscriber)))
            .collect()
    }

    /// Remove every subscriber and hand them back, for shutdown
    pub fn drain(&self) -> Vec<(SubscriberId, Arc<dyn Subscriber>)> {
        std::mem::take(&mut *self.subscribers.lock())
            .into_iter()
            .collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::websocket::subscriber::{Frame, TransportError};
    use async_trait::async_trait;

    struct NullSubscriber;

    #[async_trait]
    impl Subscriber for NullSubscriber {
        async fn send(&self, _frame: Frame) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&self) {}
    }

    #[test]
    fn test_register_issues_distinct_ids() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(Arc::new(NullSubscriber));
        let b = registry.register(Arc::new(NullSubscriber));

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(a));
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(Arc::new(NullSubscriber));

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_mutation() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(Arc::new(NullSubscriber));
        let b = registry.register(Arc::new(NullSubscriber));

        let snapshot = registry.snapshot();
        registry.unregister(a);
        registry.register(Arc::new(NullSubscriber));

        let ids: Vec<SubscriberId> = snapshot.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SubscriberRegistry::new();
        registry.register(Arc::new(NullSubscriber));
        registry.register(Arc::new(NullSubscriber));

        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_display_id() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(Arc::new(NullSubscriber));
        assert_eq!(id.to_string(), format!("sub_{}", id.as_u64()));
    }
}
