#![deny(clippy::pedantic, unsafe_code)]

//! Detached-signature verification against a set of trusted keys
//!
//! The trust key set is a primary key plus every key file found in a trusted
//! keys directory. Content is trusted when ANY of its signatures verifies
//! against ANY trusted key. Signatures are made over the raw SHA-256 digest
//! of the content, never over the content itself.

mod store;
#[cfg(feature = "test-utils")]
pub mod testing;

pub use store::{TrustStore, VerifiedBy};

use minisign_verify::{PublicKey, Signature};
use pkgfetch_errors::{Error, SigningError};
use pkgfetch_hash::Hash;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Minisign,
}

/// A trusted public key as loaded from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyRef {
    pub id: String,
    pub algo: Algorithm,
    pub data: String,
}

/// The signature-verification capability used by the trust store
///
/// Implementations answer one question: does `signature` over `digest`
/// verify under `key`. An `Err` means the key or signature could not be
/// interpreted; callers treat it as "not verified" and move on.
pub trait SignatureVerifier: Send + Sync {
    /// Verify a single signature over a content digest with a single key
    ///
    /// # Errors
    /// Returns an error if the key or signature is malformed.
    fn verify(&self, key: &PublicKeyRef, signature: &str, digest: &Hash) -> Result<bool, Error>;

    /// Check a key when it is loaded, so unusable keys are reported once
    ///
    /// # Errors
    /// Returns an error if the key cannot be used by this verifier.
    fn check_key(&self, _key: &PublicKeyRef) -> Result<(), Error> {
        Ok(())
    }
}

/// Minisign verification of signatures over the 32-byte digest
#[derive(Debug, Clone, Copy, Default)]
pub struct MinisignVerifier;

impl SignatureVerifier for MinisignVerifier {
    fn verify(&self, key: &PublicKeyRef, signature: &str, digest: &Hash) -> Result<bool, Error> {
        if key.algo != Algorithm::Minisign {
            return Ok(false);
        }

        let pk = parse_public_key(&key.data)?;
        // Parse signature (full minisign string including comment lines)
        let sig = Signature::decode(signature.trim())
            .map_err(|e| SigningError::InvalidSignatureFormat(e.to_string()))?;

        Ok(pk.verify(digest.as_bytes(), &sig, false).is_ok())
    }

    fn check_key(&self, key: &PublicKeyRef) -> Result<(), Error> {
        parse_public_key(&key.data).map(|_| ())
    }
}

/// Parse a minisign public key, either a `.pub` file body or a bare base64 line
fn parse_public_key(data: &str) -> Result<PublicKey, Error> {
    let trimmed = data.trim();
    let parsed = if trimmed.starts_with("untrusted comment:") {
        PublicKey::decode(trimmed)
    } else {
        PublicKey::from_base64(trimmed)
    };
    parsed.map_err(|e| SigningError::InvalidPublicKey(e.to_string()).into())
}
