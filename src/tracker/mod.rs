//! Event tracker
//!
//! The [`Tracker`] hands out registered events, lets the caller fill them in, and
//! submits each one exactly once:
//!
//! - **create**: [`Tracker::create_event`] evicts stale events and registers a fresh one
//! - **build**: the caller fills the event through [`EventHandle::lock`]
//! - **track**: [`Tracker::track`] removes the event from the registry and submits it
//!
//! Misuse never fails the caller. Tracking an event twice, or one that was never
//! created by this tracker, logs a warning and submits nothing. Transport failures
//! are logged and swallowed.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use tirreno_tracker::Tracker;
//!
//! let tracker = Tracker::new("https://localhost/tirreno/sensor/", "api-key")?;
//!
//! let event = tracker.create_event();
//! event
//!     .lock()
//!     .set_user_name("alice")
//!     .set_ip_address("1.2.3.4")
//!     .set_url("https://example.com/login")
//!     .set_http_method("POST")
//!     .set_event_type_account_login();
//!
//! tracker.track(&event).await;
//! ```
//!
//! # Concurrency
//!
//! Registry operations are atomic with respect to each other, so a tracker can be
//! shared behind an `Arc`. The registry lock is released before the submission is
//! awaited; a slow endpoint delays only the `track` call that is waiting on it, for
//! at most the configured connection timeout.

pub mod config;
pub mod registry;
pub mod submitter;

pub use config::TrackerConfig;
pub use registry::{EventHandle, EventRegistry};
pub use submitter::{form_pairs, HttpSubmitter, NullSubmitter, Submitter};

use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a [`Tracker::track`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The event was removed from the registry and delivered to the submitter
    Submitted,
    /// The event was removed from the registry but the submitter reported an error
    SubmissionFailed,
    /// The identifier is not pending: never created here, already tracked, or evicted
    UnknownEvent,
    /// The caller still holds the event's lock; it stays registered and can be tracked later
    EventLocked,
}

/// Client for the tirreno sensor API
pub struct Tracker {
    registry: EventRegistry,
    submitter: Arc<dyn Submitter>,
}

impl Tracker {
    /// Create a tracker for `api_url` with default timeouts
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(TrackerConfig::new(api_url, api_key))
    }

    /// Create a tracker posting over HTTP with the given configuration
    pub fn with_config(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let submitter = HttpSubmitter::with_config(&config)?;
        Ok(Self::with_submitter(&config, Arc::new(submitter)))
    }

    /// Create a tracker from `TIRRENO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(TrackerConfig::from_env()?)
    }

    /// Create a tracker that hands dumped events to a custom submitter
    pub fn with_submitter(config: &TrackerConfig, submitter: Arc<dyn Submitter>) -> Self {
        Self {
            registry: EventRegistry::new(config.event_timeout),
            submitter,
        }
    }

    /// Create and register a new event.
    ///
    /// Pending events older than the event timeout are dropped first.
    pub fn create_event(&self) -> EventHandle {
        self.registry.create()
    }

    /// Look up a pending event by identifier
    pub fn get_event(&self, id: &str) -> Option<EventHandle> {
        self.registry.get(id)
    }

    /// Number of events created but not yet tracked or evicted
    pub fn pending_events(&self) -> usize {
        self.registry.len()
    }

    /// Submit an event created by this tracker.
    ///
    /// The event is removed from the registry before anything is sent, so a second call
    /// with the same handle is a no-op that only logs a warning. Tracking never waits on
    /// the event's lock: if the caller still holds it, the event is put back untouched.
    pub async fn track(&self, event: &EventHandle) -> TrackOutcome {
        let Some(entry) = self.registry.take_entry(event.id()) else {
            warn!(
                event_id = %event.id(),
                "Tracker misses Event object with uuid {}, create Event objects via \
                 Tracker::create_event() and do not reuse them",
                event.id()
            );
            return TrackOutcome::UnknownEvent;
        };

        let event = entry.event.clone();
        let data = match event.try_lock() {
            Some(guard) => guard.dump(),
            None => {
                warn!(
                    event_id = %event.id(),
                    "Event {} is still locked by the caller, release it before tracking",
                    event.id()
                );
                self.registry.restore(entry);
                return TrackOutcome::EventLocked;
            }
        };

        match self.submitter.submit(&data).await {
            Ok(()) => {
                info!(event_id = %event.id(), "Event tracked");
                TrackOutcome::Submitted
            }
            Err(e) => {
                warn!(event_id = %event.id(), error = %e, "Failed to submit event: {}", e);
                TrackOutcome::SubmissionFailed
            }
        }
    }
}
