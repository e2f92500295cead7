//! Event Bus implementation.
//!
//! One bus is created by the host and shared as `Arc<EventBus>` with the
//! registry and the monitor. Delivery is synchronous for handlers and
//! best-effort for broadcast receivers; a lagging receiver never blocks a
//! monitoring tick.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventCategory, ToolwatchEvent};

/// Broadcast channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// Events kept in the journal
const DEFAULT_JOURNAL_SIZE: usize = 200;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.0.simple().to_string();
        write!(f, "sub-{}", &id[..8])
    }
}

/// Which events a handler receives
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Events in any of these categories
    Categories(Vec<EventCategory>),
    /// Events that ask for operator attention
    Warnings,
}

impl EventFilter {
    pub fn matches(&self, event: &ToolwatchEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
            EventFilter::Warnings => event.is_warning(),
        }
    }
}

type EventHandler = Box<dyn Fn(&ToolwatchEvent) + Send + Sync>;

/// An event as recorded in the journal
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub event: ToolwatchEvent,
}

/// Event bus for registry, monitor and host
pub struct EventBus {
    sender: broadcast::Sender<ToolwatchEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    journal: Mutex<VecDeque<JournalEntry>>,
    journal_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY, DEFAULT_JOURNAL_SIZE)
    }

    /// Bus with a custom broadcast capacity and journal length.
    /// A `journal_size` of zero disables the journal.
    pub fn with_capacity(channel_capacity: usize, journal_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            journal: Mutex::new(VecDeque::with_capacity(journal_size.min(1024))),
            journal_size,
        }
    }

    /// Deliver `event` to matching handlers and broadcast receivers.
    ///
    /// Returns how many handlers and receivers were reached. Emitting with
    /// nobody listening is not an error.
    pub fn emit(&self, event: ToolwatchEvent) -> usize {
        tracing::trace!("event: {}", event.description());
        self.record(&event);

        let mut delivered = 0;
        for (filter, handler) in self.handlers.read().values() {
            if filter.matches(&event) {
                handler(&event);
                delivered += 1;
            }
        }

        delivered + self.sender.send(event).unwrap_or(0)
    }

    /// Register a handler called on the emitting thread.
    ///
    /// Handlers run inside monitoring ticks and must return quickly. They
    /// must not subscribe or unsubscribe from within the callback.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&ToolwatchEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.handlers.write().insert(id, (filter, Box::new(handler)));
        tracing::debug!("Event subscription {} added", id);
        id
    }

    /// Remove a handler. Returns false for an unknown id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Event subscription {} removed", id);
        }
        removed
    }

    /// Receiver for async consumers. Slow receivers lose the oldest events.
    pub fn receiver(&self) -> broadcast::Receiver<ToolwatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Up to `limit` most recent journal entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        let journal = self.journal.lock();
        let skip = journal.len().saturating_sub(limit);
        journal.iter().skip(skip).cloned().collect()
    }

    /// Most recent event that asked for operator attention
    pub fn last_warning(&self) -> Option<JournalEntry> {
        self.journal
            .lock()
            .iter()
            .rev()
            .find(|entry| entry.event.is_warning())
            .cloned()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    fn record(&self, event: &ToolwatchEvent) {
        if self.journal_size == 0 {
            return;
        }
        let mut journal = self.journal.lock();
        if journal.len() == self.journal_size {
            journal.pop_front();
        }
        journal.push_back(JournalEntry {
            at: Utc::now(),
            event: event.clone(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("journaled", &self.journal.lock().len())
            .finish()
    }
}
