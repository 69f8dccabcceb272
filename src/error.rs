//! Error types and result aliases for the tracker.
//!
//! This module defines the error type [`TrackerError`] and the [`Result`] type alias.
//! Errors only surface while configuring a [`Tracker`](crate::Tracker) or inside a
//! [`Submitter`](crate::tracker::Submitter); tracking itself degrades to log-and-continue
//! so the host application's request flow is never interrupted.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
