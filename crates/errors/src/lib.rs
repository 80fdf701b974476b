#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for pkgfetch
//!
//! This crate provides fine-grained error types organized by the stage of a
//! package fetch that produced them. All error types implement Clone so that
//! per-part failures can be collected and reported together.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

pub mod config;
pub mod manifest;
pub mod network;
pub mod part;
pub mod signing;
pub mod storage;

// Re-export all error types at the root
pub use config::ConfigError;
pub use manifest::ManifestError;
pub use network::NetworkError;
pub use part::PartError;
pub use signing::SigningError;
pub use storage::StorageError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("part error: {0}")]
    Part(#[from] PartError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("error fetching parts: {0}")]
    Parts(PartFailures),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// The per-part failures if this is an aggregate part failure
    #[must_use]
    pub fn part_failures(&self) -> Option<&PartFailures> {
        match self {
            Self::Parts(failures) => Some(failures),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<PartFailures> for Error {
    fn from(failures: PartFailures) -> Self {
        Self::Parts(failures)
    }
}

/// Result type alias for pkgfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of individual parts, keyed by part name
///
/// Produced once every part task of a fetch has finished, so it always
/// describes every failing part rather than only the first one.
#[derive(Debug, Clone, Default)]
pub struct PartFailures {
    errors: BTreeMap<String, Error>,
}

impl PartFailures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the failure of a part, replacing any earlier failure for it
    pub fn insert(&mut self, part: impl Into<String>, error: Error) {
        self.errors.insert(part.into(), error);
    }

    #[must_use]
    pub fn get(&self, part: &str) -> Option<&Error> {
        self.errors.get(part)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.errors.iter().map(|(name, err)| (name.as_str(), err))
    }
}

impl fmt::Display for PartFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} part(s) failed", self.errors.len())?;
        for (name, err) in &self.errors {
            write!(f, "; {name}: {err}")?;
        }
        Ok(())
    }
}

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Network(err) => err.user_message(),
            Error::Manifest(err) => err.user_message(),
            Error::Part(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Config(err) => err.user_hint(),
            Error::Storage(err) => err.user_hint(),
            Error::Network(err) => err.user_hint(),
            Error::Manifest(err) => err.user_hint(),
            Error::Part(err) => err.user_hint(),
            Error::Parts(_) => {
                Some("Inspect the per-part failures; a rerun skips parts already on disk.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            Error::Manifest(err) => err.is_retryable(),
            Error::Part(err) => err.is_retryable(),
            Error::Storage(err) => err.is_retryable(),
            Error::Parts(failures) => failures.iter().all(|(_, err)| err.is_retryable()),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Config(err) => err.user_code(),
            Error::Storage(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::Manifest(err) => err.user_code(),
            Error::Part(err) => err.user_code(),
            Error::Signing(err) => err.user_code(),
            Error::Parts(_) => Some("fetch.parts_failed"),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
