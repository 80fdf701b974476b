//! Manifest retrieval and precheck error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("unexpected status code {status} fetching manifest from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("failed to fetch manifest from {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("manifest from {url} failed cryptographic verification: {reason}")]
    VerificationFailed { url: String, reason: String },

    #[error("manifest from {url} could not be parsed: {message}")]
    ParseFailed { url: String, message: String },

    #[error("failed to write manifest to {path}: {message}")]
    PersistFailed { path: String, message: String },

    #[error("manifest meta.provides is missing metadata for part {part_id} ({part})")]
    PrecheckFailed { part_id: String, part: String },
}

impl UserFacingError for ManifestError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnexpectedStatus { .. } | Self::FetchFailed { .. } => {
                Some("Check the manifest URL and any credentials configured for it.")
            }
            Self::VerificationFailed { .. } => Some(
                "Confirm the manifest signature matches the manifest and a trusted key signed it.",
            ),
            Self::PrecheckFailed { .. } => {
                Some("The package publisher must list every part under meta.provides.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnexpectedStatus { .. } => "manifest.unexpected_status",
            Self::FetchFailed { .. } => "manifest.fetch_failed",
            Self::VerificationFailed { .. } => "manifest.verification_failed",
            Self::ParseFailed { .. } => "manifest.parse_failed",
            Self::PersistFailed { .. } => "manifest.persist_failed",
            Self::PrecheckFailed { .. } => "manifest.precheck_failed",
        };
        Some(code)
    }
}
