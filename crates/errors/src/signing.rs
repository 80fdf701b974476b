//! Signing error types

use thiserror::Error;

use crate::UserFacingError;
use std::borrow::Cow;

#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("none of {signatures} signature(s) verified against {keys} trusted key(s)")]
    NoSignatureVerified { signatures: usize, keys: usize },

    #[error("no trusted keys available for verification")]
    NoTrustedKeys,

    #[error("failed to load trusted key {path}: {message}")]
    KeyLoadFailed { path: String, message: String },

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("invalid public key format: {0}")]
    InvalidPublicKey(String),
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoSignatureVerified { .. } => "signing.no_signature_verified",
            Self::NoTrustedKeys => "signing.no_trusted_keys",
            Self::KeyLoadFailed { .. } => "signing.key_load_failed",
            Self::InvalidSignatureFormat(_) => "signing.invalid_signature_format",
            Self::InvalidPublicKey(_) => "signing.invalid_public_key",
        };
        Some(code)
    }
}
