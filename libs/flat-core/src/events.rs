//! Change notifications for database writes
//!
//! Listeners subscribe to one collection or to every collection (`*`) and are
//! called synchronously, in subscription order, for each created, updated or
//! deleted record.

use crate::database::Collection;
use chrono::{DateTime, Utc};
use flat_common::WILDCARD_TOPIC;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Updated => write!(f, "UPDATED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A change to one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub collection: Collection,
    pub entity_id: String,
    /// Record after the change; `None` for deletes
    pub data: Option<serde_json::Value>,
    /// Record before the change; `None` for creates
    pub previous_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// What a listener subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Collection(Collection),
    All,
}

impl Topic {
    #[must_use]
    pub fn matches(self, collection: Collection) -> bool {
        match self {
            Self::All => true,
            Self::Collection(topic) => topic == collection,
        }
    }
}

impl From<Collection> for Topic {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl FromStr for Topic {
    type Err = crate::error::FlatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD_TOPIC {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Collection)
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD_TOPIC),
            Self::Collection(collection) => write!(f, "{collection}"),
        }
    }
}

/// Callback invoked for matching events
pub type Callback = Arc<dyn Fn(&DbEvent) + Send + Sync>;

struct Listener {
    id: u64,
    topic: Topic,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Destination for events produced by CRUD operations
pub trait EventSink {
    fn publish(&self, event: DbEvent);
}

/// Pub/sub hub for database events
#[derive(Clone, Default)]
pub struct EventManager {
    registry: Arc<RwLock<Registry>>,
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events on `topic`
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, callback: F) -> Subscription
    where
        F: Fn(&DbEvent) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let mut registry = self.registry.write();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push(Listener {
            id,
            topic,
            callback: Arc::new(callback),
        });
        debug!(listener = id, topic = %topic, "Listener subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every matching listener, in subscription order
    ///
    /// The listener list is snapshotted first, so callbacks may subscribe or
    /// unsubscribe while running.
    pub fn emit(&self, event: &DbEvent) {
        let callbacks: Vec<Callback> = self
            .registry
            .read()
            .listeners
            .iter()
            .filter(|listener| listener.topic.matches(event.collection))
            .map(|listener| Arc::clone(&listener.callback))
            .collect();
        trace!(
            kind = %event.kind,
            collection = %event.collection,
            entity = %event.entity_id,
            listeners = callbacks.len(),
            "Emitting event"
        );
        for callback in callbacks {
            callback(event);
        }
    }

    /// Build a timestamped event with a fresh id
    #[must_use]
    pub fn create_event(
        kind: EventKind,
        collection: Collection,
        entity_id: impl Into<String>,
        data: Option<serde_json::Value>,
        previous_data: Option<serde_json::Value>,
    ) -> DbEvent {
        DbEvent {
            id: Uuid::new_v4(),
            kind,
            collection,
            entity_id: entity_id.into(),
            data,
            previous_data,
            timestamp: Utc::now(),
        }
    }

    /// Drop every listener
    pub fn clear_listeners(&self) {
        let mut registry = self.registry.write();
        let dropped = registry.listeners.len();
        registry.listeners.clear();
        debug!(dropped, "Cleared event listeners");
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.read().listeners.len()
    }
}

impl EventSink for EventManager {
    fn publish(&self, event: DbEvent) {
        self.emit(&event);
    }
}

/// Handle returned by [`EventManager::subscribe`]
///
/// Dropping it keeps the listener registered; call [`Subscription::unsubscribe`]
/// to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    /// Remove the listener; returns whether it was still registered
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.write();
        let before = registry.listeners.len();
        registry.listeners.retain(|listener| listener.id != self.id);
        before != registry.listeners.len()
    }
}

/// Collects events so they can be delivered later, or discarded
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<DbEvent>>,
}

impl EventBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Take the buffered events, oldest first
    pub fn drain(&self) -> Vec<DbEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Deliver the buffered events to `sink`
    pub fn flush_into(&self, sink: &dyn EventSink) {
        for event in self.drain() {
            sink.publish(event);
        }
    }
}

impl EventSink for EventBuffer {
    fn publish(&self, event: DbEvent) {
        self.events.lock().push(event);
    }
}
