//! Publish/subscribe plumbing
//!
//! Consumers register callbacks and get a [`SubscriptionId`] back, which is
//! the only way to unregister. There is no global event bus: every stream
//! belongs to the tracker that publishes it.

use std::fmt;

/// Handle returned by every `subscribe` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Ordered list of subscriber callbacks
pub struct Subscribers<T> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Subscribers {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was never issued or is already released
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    /// Invoke every callback in subscription order
    pub fn publish(&mut self, value: &T) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

/// A single current value with change notification
///
/// Setting an equal value is a no-op for subscribers.
#[derive(Debug)]
pub struct CurrentValue<T> {
    value: T,
    subscribers: Subscribers<T>,
}

impl<T: PartialEq> CurrentValue<T> {
    pub fn new(value: T) -> Self {
        CurrentValue {
            value,
            subscribers: Subscribers::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value. Returns true if it changed (and subscribers ran).
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.subscribers.publish(&self.value);
        true
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }
}
