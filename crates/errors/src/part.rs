//! Per-part fetch and verification error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PartError {
    #[error("authentication or authorization error fetching {path} from {url}: HTTP {status}")]
    Unauthorized {
        path: String,
        url: String,
        status: u16,
    },

    #[error("part {path} could not be fetched from any of its sources; last source {url}: {reason}")]
    SourcesExhausted {
        path: String,
        url: String,
        reason: String,
    },

    #[error("part {path} declares no sources to fetch from")]
    NoSources { path: String },

    #[error("part {path} hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("part {path} failed cryptographic verification: {reason}")]
    SignatureRejected { path: String, reason: String },
}

impl UserFacingError for PartError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { .. } => {
                Some("Check the credentials configured for the part's source URL prefix.")
            }
            Self::SourcesExhausted { .. } => Some("Check that the part sources are reachable."),
            Self::HashMismatch { .. } => {
                Some("The downloaded content was discarded; the source may be serving stale data.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::SourcesExhausted { .. } | Self::HashMismatch { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Unauthorized { .. } => "part.unauthorized",
            Self::SourcesExhausted { .. } => "part.sources_exhausted",
            Self::NoSources { .. } => "part.no_sources",
            Self::HashMismatch { .. } => "part.hash_mismatch",
            Self::SignatureRejected { .. } => "part.signature_rejected",
        };
        Some(code)
    }
}
