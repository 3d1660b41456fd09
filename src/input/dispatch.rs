//! Ordered delivery of transition events to input consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use super::state::TransitionEvent;

/// Something that reacts to key transitions.
pub trait InputConsumer: Send + Sync {
    /// Handle an event. Return `true` to stop propagation.
    ///
    /// Called on the polling thread; long work belongs elsewhere.
    fn process(&self, event: &TransitionEvent) -> bool;
}

impl<F> InputConsumer for F
where
    F: Fn(&TransitionEvent) -> bool + Send + Sync,
{
    fn process(&self, event: &TransitionEvent) -> bool {
        self(event)
    }
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type ConsumerList = Vec<(Subscription, Arc<dyn InputConsumer>)>;

/// Delivers events to consumers in registration order.
///
/// The consumer list is copy-on-write: subscribing or unsubscribing swaps
/// in a new list, and a dispatch in flight keeps the list it started with.
#[derive(Default)]
pub struct EventDispatcher {
    consumers: RwLock<Arc<ConsumerList>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create a dispatcher with no consumers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer after all existing ones.
    pub fn subscribe(&self, consumer: Arc<dyn InputConsumer>) -> Subscription {
        let handle = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.consumers.write().unwrap_or_else(PoisonError::into_inner);
        let mut list = ConsumerList::clone(&guard);
        list.push((handle, consumer));
        *guard = Arc::new(list);
        debug!(subscription = handle.0, consumers = guard.len(), "Consumer subscribed");
        handle
    }

    /// Remove a consumer. Returns false if the handle was not registered.
    pub fn unsubscribe(&self, handle: Subscription) -> bool {
        let mut guard = self.consumers.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.iter().any(|(h, _)| *h == handle) {
            return false;
        }
        let list: ConsumerList = guard
            .iter()
            .filter(|(h, _)| *h != handle)
            .cloned()
            .collect();
        *guard = Arc::new(list);
        debug!(subscription = handle.0, consumers = guard.len(), "Consumer unsubscribed");
        true
    }

    /// Point-in-time copy of the consumer list.
    fn snapshot(&self) -> Arc<ConsumerList> {
        Arc::clone(&self.consumers.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of registered consumers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True if no consumer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer `event` to each consumer until one claims it.
    ///
    /// Returns whether the event was claimed.
    pub fn dispatch(&self, event: &TransitionEvent) -> bool {
        let consumers = self.snapshot();
        for (handle, consumer) in consumers.iter() {
            if consumer.process(event) {
                trace!(subscription = handle.0, "Event consumed");
                return true;
            }
        }
        trace!("Event not claimed");
        false
    }
}
