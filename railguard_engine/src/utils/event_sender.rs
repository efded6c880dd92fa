use std::sync::Mutex;
use crate::utils::storage::{Id, Storage};

/// Handle returned by [`EventSender::subscribe`], used to unsubscribe
pub type SubscriptionId = Id;

type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// Publish/subscribe channel for one kind of event.
///
/// Handlers run synchronously on the thread calling [`send`](EventSender::send),
/// in subscription order. A handler must not subscribe or unsubscribe on the
/// sender that is invoking it (the subscriber list is locked during `send`).
pub struct EventSender<T> {
    subscribers: Mutex<Storage<Handler<T>>>,
}

impl<T> EventSender<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Storage::new()),
        }
    }

    /// Register a handler, returns its subscription id
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.subscribers.lock().unwrap().push(Box::new(handler))
    }

    /// Remove a handler. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().unwrap().remove(id);
    }

    /// Deliver an event to every handler
    pub fn send(&self, event: &T) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for (_, handler) in subscribers.iter_mut() {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl<T> Default for EventSender<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_sender_tests.rs"]
mod tests;
