//! In-flight event registry
//!
//! This module keeps every event handed out by the tracker until it is either consumed
//! for submission or evicted as stale. Eviction runs only as a side effect of
//! [`EventRegistry::create`]: each call scans all entries and drops those older than
//! the configured timeout. The scan is O(n) per create.

use crate::event::Event;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared reference to a registered [`Event`].
///
/// The registry and the caller hold the same instance, so changes made through
/// [`lock`](EventHandle::lock) are what gets submitted.
///
/// # Examples
///
/// ```
/// use tirreno_tracker::tracker::EventRegistry;
/// use std::time::Duration;
///
/// let registry = EventRegistry::new(Duration::from_secs(30));
/// let event = registry.create();
/// event.lock().set_user_name("alice").set_http_method("GET");
///
/// let found = registry.get(event.id()).unwrap();
/// assert_eq!(found.lock().user_name(), Some("alice"));
/// ```
#[derive(Debug, Clone)]
pub struct EventHandle {
    id: Arc<str>,
    event: Arc<Mutex<Event>>,
}

impl EventHandle {
    /// Wrap an event that was built outside the registry
    pub fn new(event: Event) -> Self {
        Self {
            id: Arc::from(event.id()),
            event: Arc::new(Mutex::new(event)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lock the event for reading or building
    pub fn lock(&self) -> MutexGuard<'_, Event> {
        self.event.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles point at the same event instance
    pub fn ptr_eq(&self, other: &EventHandle) -> bool {
        Arc::ptr_eq(&self.event, &other.event)
    }

    /// Lock the event only if nobody else holds it
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Event>> {
        match self.event.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }
}

impl From<Event> for EventHandle {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}

/// A registry slot taken out by [`EventRegistry::take_entry`]
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) event: EventHandle,
    created_at: i64,
    seq: u64,
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<Arc<str>, Entry>,
    next_seq: u64,
}

/// Store of events that were created but not yet submitted
///
/// Each identifier maps to exactly one entry. An entry leaves the registry once, either
/// through [`take`](EventRegistry::take) or through stale eviction, whichever happens
/// first. The whole create and take bodies run under one lock.
#[derive(Debug)]
pub struct EventRegistry {
    entries: Mutex<Entries>,
    event_timeout: Duration,
}

impl EventRegistry {
    /// Create an empty registry
    ///
    /// # Arguments
    ///
    /// * `event_timeout` - Age after which an unsubmitted event is dropped
    pub fn new(event_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            event_timeout,
        }
    }

    /// Evict stale entries, then register and return a fresh event.
    pub fn create(&self) -> EventHandle {
        self.create_at(current_epoch_seconds())
    }

    fn create_at(&self, now: i64) -> EventHandle {
        let timeout = i64::try_from(self.event_timeout.as_secs()).unwrap_or(i64::MAX);
        let mut entries = self.lock_entries();
        let evicted = evict_stale(&mut entries, now.saturating_sub(timeout));

        let event = EventHandle::new(Event::new(Uuid::new_v4().to_string()));
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.by_id.insert(
            Arc::clone(&event.id),
            Entry {
                event: event.clone(),
                created_at: now,
                seq,
            },
        );

        debug!(
            event_id = %event.id(),
            pending = entries.by_id.len(),
            evicted,
            "Event created"
        );
        event
    }

    /// Look up a pending event without changing the registry
    pub fn get(&self, id: &str) -> Option<EventHandle> {
        self.lock_entries().by_id.get(id).map(|entry| entry.event.clone())
    }

    /// Remove and return the pending event registered under `id`.
    ///
    /// Returns `None` when the identifier was never issued, was already taken, or was
    /// evicted.
    pub fn take(&self, id: &str) -> Option<EventHandle> {
        self.take_entry(id).map(|entry| entry.event)
    }

    pub(crate) fn take_entry(&self, id: &str) -> Option<Entry> {
        self.lock_entries().by_id.remove(id)
    }

    /// Put a taken entry back with its original creation time
    pub(crate) fn restore(&self, entry: Entry) {
        let mut entries = self.lock_entries();
        entries.by_id.entry(Arc::clone(&entry.event.id)).or_insert(entry);
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.lock_entries().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().by_id.is_empty()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, seconds: i64) {
        if let Some(entry) = self.lock_entries().by_id.get_mut(id) {
            entry.created_at -= seconds;
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(super::config::DEFAULT_EVENT_TIMEOUT_SECS))
    }
}

/// Drop every entry created strictly before `cutoff`, in insertion order.
///
/// Returns the number of dropped entries.
fn evict_stale(entries: &mut Entries, cutoff: i64) -> usize {
    let mut stale: Vec<(u64, Arc<str>)> = entries
        .by_id
        .iter()
        .filter(|(_, entry)| entry.created_at < cutoff)
        .map(|(id, entry)| (entry.seq, Arc::clone(id)))
        .collect();
    stale.sort_unstable_by_key(|(seq, _)| *seq);

    let mut dropped = 0;
    for (_, id) in stale {
        let Some(entry) = entries.by_id.remove(&id) else {
            continue;
        };

        // The caller may still be holding the event; report it without content then.
        match entry.event.try_lock() {
            Some(event) => {
                let content = serde_json::Value::Object(event.dump());
                warn!(
                    event_id = %id,
                    "Event {} was outdated, dropping event with content {}",
                    id,
                    content
                );
            }
            None => {
                warn!(event_id = %id, "Event {} was outdated, dropping event", id);
            }
        }
        dropped += 1;
    }

    dropped
}

fn current_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::LogCapture;
    use std::collections::HashSet;

    #[test]
    fn test_create_registers_event() {
        let registry = EventRegistry::default();
        let event = registry.create();

        assert_eq!(registry.len(), 1);
        assert!(registry.get(event.id()).unwrap().ptr_eq(&event));
        assert_eq!(event.lock().id(), event.id());
    }

    #[test]
    fn test_identifiers_are_unique() {
        let registry = EventRegistry::default();
        let ids: HashSet<String> = (0..100).map(|_| registry.create().id().to_string()).collect();

        assert_eq!(ids.len(), 100);
        assert_eq!(registry.len(), 100);
    }

    #[test]
    fn test_get_does_not_remove() {
        let registry = EventRegistry::default();
        let event = registry.create();

        assert!(registry.get(event.id()).is_some());
        assert!(registry.get(event.id()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let registry = EventRegistry::default();
        assert!(registry.get("fake-uuid").is_none());
    }

    #[test]
    fn test_take_is_one_shot() {
        let registry = EventRegistry::default();
        let event = registry.create();

        let taken = registry.take(event.id()).unwrap();
        assert!(taken.ptr_eq(&event));
        assert!(registry.take(event.id()).is_none());
        assert!(registry.get(event.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mutations_visible_through_registry() {
        let registry = EventRegistry::default();
        let event = registry.create();
        event.lock().set_user_name("alice").set_url("https://ex/");

        let taken = registry.take(event.id()).unwrap();
        let dump = taken.lock().dump();
        assert_eq!(dump["userName"], "alice");
        assert_eq!(dump["url"], "https://ex/");
    }

    #[test]
    fn test_create_evicts_aged_entry() {
        let registry = EventRegistry::new(Duration::from_secs(1));
        let old = registry.create();
        registry.backdate(old.id(), 999);

        old.lock().set_user_name("alice");

        let logs = LogCapture::default();
        let fresh = {
            let _guard = logs.install();
            registry.create()
        };

        assert!(registry.get(old.id()).is_none());
        assert!(registry.get(fresh.id()).is_some());
        assert_eq!(registry.len(), 1);

        let dropped = logs.lines_containing("dropping event");
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].contains(old.id()));
        assert!(dropped[0].contains("alice"));
        assert!(!logs.contents().contains(&format!("Event {} was outdated", fresh.id())));
    }

    #[test]
    fn test_entry_at_cutoff_is_kept() {
        let registry = EventRegistry::new(Duration::from_secs(30));
        let now = current_epoch_seconds();
        let event = registry.create_at(now - 30);

        registry.create_at(now);

        assert!(registry.get(event.id()).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_eviction_only_drops_stale_entries() {
        let registry = EventRegistry::new(Duration::from_secs(30));
        let now = current_epoch_seconds();
        let stale_a = registry.create_at(now - 100);
        let fresh = registry.create_at(now - 5);
        let stale_b = registry.create_at(now - 31);

        registry.create_at(now);

        assert!(registry.get(stale_a.id()).is_none());
        assert!(registry.get(stale_b.id()).is_none());
        assert!(registry.get(fresh.id()).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_evict_stale_reports_in_insertion_order() {
        let registry = EventRegistry::new(Duration::from_secs(1000));
        let now = current_epoch_seconds();
        let ids: Vec<String> =
            (0..5).map(|i| registry.create_at(now - 100 + i).id().to_string()).collect();

        let logs = LogCapture::default();
        let dropped = {
            let _guard = logs.install();
            let mut entries = registry.lock_entries();
            evict_stale(&mut entries, now)
        };

        assert_eq!(dropped, 5);
        assert!(registry.is_empty());

        let lines = logs.lines_containing("dropping event");
        let reported: Vec<&String> = lines
            .iter()
            .map(|line| ids.iter().find(|id| line.contains(id.as_str())).unwrap())
            .collect();
        assert_eq!(reported, ids.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_huge_timeout_keeps_fresh_entries() {
        for secs in [u64::MAX, 1 << 63, i64::MAX as u64] {
            let registry = EventRegistry::new(Duration::from_secs(secs));
            let first = registry.create();
            let second = registry.create();

            assert!(registry.get(first.id()).is_some(), "timeout {secs}");
            assert!(registry.get(second.id()).is_some(), "timeout {secs}");
        }
    }

    #[test]
    fn test_restore_puts_entry_back() {
        let registry = EventRegistry::new(Duration::from_secs(30));
        let now = current_epoch_seconds();
        let event = registry.create_at(now - 31);

        let entry = registry.take_entry(event.id()).unwrap();
        assert!(registry.is_empty());
        registry.restore(entry);

        assert!(registry.get(event.id()).unwrap().ptr_eq(&event));
        // Original creation time survives the round trip.
        registry.create_at(now);
        assert!(registry.get(event.id()).is_none());
    }

    #[test]
    fn test_eviction_while_caller_holds_event() {
        let registry = EventRegistry::new(Duration::from_secs(1));
        let old = registry.create();
        registry.backdate(old.id(), 999);

        let logs = LogCapture::default();
        let guard = old.lock();
        {
            let _log_guard = logs.install();
            registry.create();
        }
        drop(guard);

        assert!(registry.get(old.id()).is_none());
        let dropped = logs.lines_containing("dropping event");
        assert_eq!(dropped.len(), 1);
        assert!(!dropped[0].contains("with content"));
    }

    #[test]
    fn test_taken_event_is_not_evicted_later() {
        let registry = EventRegistry::new(Duration::from_secs(1));
        let event = registry.create();
        let taken = registry.take(event.id());
        assert!(taken.is_some());

        registry.backdate(event.id(), 999);
        registry.create();
        assert!(registry.take(event.id()).is_none());
    }

    #[test]
    fn test_external_handle_is_unknown() {
        let registry = EventRegistry::default();
        registry.create();

        let stray = EventHandle::from(Event::new("fake-uuid"));
        assert!(registry.take(stray.id()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_creates_and_takes() {
        let registry = Arc::new(EventRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let mut taken = 0;
                    for _ in 0..50 {
                        let event = registry.create();
                        if registry.take(event.id()).is_some() {
                            taken += 1;
                        }
                        assert!(registry.take(event.id()).is_none());
                    }
                    taken
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 400);
        assert!(registry.is_empty());
    }
}
