#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Fetch progress events
//!
//! Library crates report what happens during a fetch by emitting events on
//! an unbounded channel. The CLI drains the channel and turns events into
//! log records and user output. Emission never blocks and never fails: a
//! dropped receiver just means nobody is listening.

mod failure;
pub use failure::FailureContext;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Everything observable about a package fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchEvent {
    FetchStarted {
        manifest_url: String,
        destination: PathBuf,
    },

    /// Manifest body received, not yet trusted
    ManifestFetched {
        url: String,
        bytes: u64,
    },

    ManifestVerified {
        url: String,
        key_id: String,
    },

    ManifestPersisted {
        id: String,
        path: PathBuf,
    },

    PartStarted {
        part: String,
        expected_bytes: u64,
        sources: usize,
    },

    /// A file of the expected size was already on disk
    PartSkipped {
        part: String,
        path: PathBuf,
    },

    /// One source failed; the next one will be tried
    SourceFailed {
        part: String,
        url: String,
        status: Option<u16>,
        reason: String,
    },

    PartDownloaded {
        part: String,
        url: String,
        bytes: u64,
    },

    PartVerified {
        part: String,
        key_id: String,
    },

    PartFailed {
        part: String,
        failure: FailureContext,
    },

    FetchCompleted {
        id: String,
        parts: usize,
    },

    FetchFailed {
        failed: usize,
        failure: FailureContext,
    },
}

impl FetchEvent {
    /// Tracing level a consumer should log this event at
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::PartFailed { .. } | Self::FetchFailed { .. } => Level::ERROR,
            Self::SourceFailed { .. } => Level::WARN,
            Self::ManifestFetched { .. }
            | Self::PartStarted { .. }
            | Self::PartDownloaded { .. }
            | Self::ManifestPersisted { .. } => Level::DEBUG,
            _ => Level::INFO,
        }
    }

    /// Part this event concerns, if any
    #[must_use]
    pub fn part(&self) -> Option<&str> {
        match self {
            Self::PartStarted { part, .. }
            | Self::PartSkipped { part, .. }
            | Self::SourceFailed { part, .. }
            | Self::PartDownloaded { part, .. }
            | Self::PartVerified { part, .. }
            | Self::PartFailed { part, .. } => Some(part),
            _ => None,
        }
    }
}

/// Type alias for the event sender
pub type EventSender = UnboundedSender<FetchEvent>;

/// Type alias for the event receiver
pub type EventReceiver = UnboundedReceiver<FetchEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Uniform emission API for anything that may carry an event sender
pub trait EventEmitter {
    fn event_sender(&self) -> Option<&EventSender>;

    fn emit(&self, event: FetchEvent) {
        if let Some(sender) = self.event_sender() {
            // receiver gone; nothing to report to
            let _ = sender.send(event);
        }
    }

    fn emit_source_failed(
        &self,
        part: impl Into<String>,
        url: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) {
        self.emit(FetchEvent::SourceFailed {
            part: part.into(),
            url: url.into(),
            status,
            reason: reason.into(),
        });
    }

    fn emit_part_failed<E: pkgfetch_errors::UserFacingError + ?Sized>(
        &self,
        part: impl Into<String>,
        error: &E,
    ) {
        self.emit(FetchEvent::PartFailed {
            part: part.into(),
            failure: FailureContext::from_error(error),
        });
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
