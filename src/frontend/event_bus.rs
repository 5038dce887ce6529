//! Publish/subscribe registry shared by the components of one application.
//!
//! A bus is an explicit value: components receive a handle to it rather than
//! reaching for a global, so every test can build its own isolated bus.
//! Clones share the same registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    event: String,
    id: u64,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: BTreeMap<String, Vec<(u64, Handler)>>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`. Handlers run in subscription order.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            event: event.to_string(),
            id,
        }
    }

    /// Remove a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = registry.handlers.get_mut(&subscription.event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        before != handlers.len()
    }

    /// Deliver `payload` to every handler of `event`. Returns how many ran.
    ///
    /// Handlers are called outside the registry lock, so they may publish or
    /// subscribe themselves.
    pub fn publish(&self, event: &str, payload: Value) -> usize {
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .handlers
                .get(event)
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in &handlers {
            handler(&payload);
        }
        log::trace!("Published '{}' to {} handlers", event, handlers.len());
        handlers.len()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.handlers.get(event).map_or(0, Vec::len)
    }

    /// Whether two handles refer to the same registry.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventBus")
            .field("events", &registry.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
