//! Client for the tirreno security analytics API.
//!
//! Build [`Event`]s through a [`Tracker`], fill them in, and track each one once:
//!
//! ```rust,ignore
//! use tirreno_tracker::prelude::*;
//!
//! let tracker = Tracker::new("https://localhost/tirreno/sensor/", "api-key")?;
//! let event = tracker.create_event();
//! event.lock().set_user_name("alice").set_url("https://example.com/");
//! tracker.track(&event).await;
//! ```

pub mod error;
pub mod event;
pub mod payload;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, TrackerError};
pub use event::{Dump, Event, EventType};
pub use payload::Payload;
pub use tracker::{EventHandle, TrackOutcome, Tracker, TrackerConfig};

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Result, TrackerError};
    pub use crate::event::{Event, EventType};
    pub use crate::payload::Payload;
    pub use crate::tracker::{EventHandle, TrackOutcome, Tracker, TrackerConfig};
}
