//! Trusted key set loading and any-of verification

use crate::{Algorithm, MinisignVerifier, PublicKeyRef, SignatureVerifier};
use pkgfetch_errors::{Error, SigningError};
use pkgfetch_hash::Hash;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, trace, warn};

/// Which signature and key established trust
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBy {
    pub key_id: String,
    pub signature_index: usize,
}

/// The primary key plus every key in the trusted keys directory
#[derive(Clone)]
pub struct TrustStore {
    keys: Vec<PublicKeyRef>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("keys", &self.key_ids())
            .finish_non_exhaustive()
    }
}

impl TrustStore {
    /// Build a store from already-loaded keys
    #[must_use]
    pub fn new(keys: Vec<PublicKeyRef>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { keys, verifier }
    }

    /// Load the primary key and the keys directory using minisign verification
    ///
    /// # Errors
    ///
    /// Returns an error if the primary key cannot be read or parsed.
    pub async fn load(primary_key: &Path, keys_dir: &Path) -> Result<Self, Error> {
        Self::load_with_verifier(primary_key, keys_dir, Arc::new(MinisignVerifier)).await
    }

    /// Load the trust key set, checking each key with `verifier`
    ///
    /// A missing keys directory contributes no keys. Key files in it that
    /// cannot be read or are rejected by the verifier are skipped with a
    /// warning. Directory keys are ordered by file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary key cannot be read or parsed, or the
    /// keys directory exists but cannot be listed.
    pub async fn load_with_verifier(
        primary_key: &Path,
        keys_dir: &Path,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, Error> {
        let mut keys = Vec::new();

        let data = fs::read_to_string(primary_key)
            .await
            .map_err(|e| SigningError::KeyLoadFailed {
                path: primary_key.display().to_string(),
                message: e.to_string(),
            })?;
        let primary = PublicKeyRef {
            id: primary_key.display().to_string(),
            algo: Algorithm::Minisign,
            data,
        };
        verifier
            .check_key(&primary)
            .map_err(|e| SigningError::KeyLoadFailed {
                path: primary.id.clone(),
                message: e.to_string(),
            })?;
        keys.push(primary);

        keys.extend(load_dir_keys(keys_dir, primary_key, verifier.as_ref()).await?);

        debug!(count = keys.len(), keys_dir = %keys_dir.display(), "loaded trusted keys");
        Ok(Self { keys, verifier })
    }

    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.iter().map(|k| k.id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify that any of `signatures` over `digest` validates under any key
    ///
    /// This runs one asymmetric verification per signature per key; callers
    /// invoke it once per content digest. A signature or key that cannot be
    /// interpreted counts as not verifying, so the outcome does not depend on
    /// the order of `signatures`.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::NoTrustedKeys` for an empty store and
    /// `SigningError::NoSignatureVerified` when nothing verifies.
    pub fn verify_any(&self, digest: &Hash, signatures: &[String]) -> Result<VerifiedBy, Error> {
        if self.keys.is_empty() {
            return Err(SigningError::NoTrustedKeys.into());
        }

        for (index, signature) in signatures.iter().enumerate() {
            for key in &self.keys {
                match self.verifier.verify(key, signature, digest) {
                    Ok(true) => {
                        debug!(key = %key.id, signature = index, %digest, "signature verified");
                        return Ok(VerifiedBy {
                            key_id: key.id.clone(),
                            signature_index: index,
                        });
                    }
                    Ok(false) => {
                        trace!(key = %key.id, signature = index, "signature did not verify");
                    }
                    Err(e) => {
                        debug!(key = %key.id, signature = index, error = %e, "signature unusable");
                    }
                }
            }
        }

        Err(SigningError::NoSignatureVerified {
            signatures: signatures.len(),
            keys: self.keys.len(),
        }
        .into())
    }
}

async fn load_dir_keys(
    keys_dir: &Path,
    primary_key: &Path,
    verifier: &dyn SignatureVerifier,
) -> Result<Vec<PublicKeyRef>, Error> {
    let mut entries = match fs::read_dir(keys_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(keys_dir = %keys_dir.display(), "trusted keys directory absent");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::io_with_path(&e, keys_dir)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, keys_dir))?
    {
        let path = entry.path();
        if path == primary_key {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => paths.push(path),
            _ => {}
        }
    }
    paths.sort();

    let mut keys = Vec::with_capacity(paths.len());
    for path in paths {
        let data = match fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable trusted key");
                continue;
            }
        };
        let key = PublicKeyRef {
            id: path.display().to_string(),
            algo: Algorithm::Minisign,
            data,
        };
        if let Err(e) = verifier.check_key(&key) {
            warn!(path = %path.display(), error = %e, "skipping unusable trusted key");
            continue;
        }
        keys.push(key);
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minisign::KeyPair;
    use std::io::Cursor;
    use tempfile::TempDir;

    struct Key {
        pk: minisign::PublicKey,
        sk: minisign::SecretKey,
    }

    fn key() -> Key {
        let KeyPair { pk, sk } = KeyPair::generate_unencrypted_keypair().unwrap();
        Key { pk, sk }
    }

    fn sign(key: &Key, digest: &Hash) -> String {
        minisign::sign(None, &key.sk, Cursor::new(digest.as_bytes()), None, None)
            .unwrap()
            .into_string()
    }

    async fn store_with(primary: &Key, dir_keys: &[&Key]) -> (TempDir, TrustStore) {
        let tmp = TempDir::new().unwrap();
        let primary_path = tmp.path().join("primary.pub");
        fs::write(&primary_path, primary.pk.to_base64()).await.unwrap();

        let keys_dir = tmp.path().join("keys");
        fs::create_dir(&keys_dir).await.unwrap();
        for (i, k) in dir_keys.iter().enumerate() {
            fs::write(keys_dir.join(format!("user{i}.pub")), k.pk.to_base64())
                .await
                .unwrap();
        }
        // not a key; skipped
        fs::write(keys_dir.join("README"), "not a key").await.unwrap();

        let store = TrustStore::load(&primary_path, &keys_dir).await.unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_any_signature_any_key() {
        let primary = key();
        let user = key();
        let stranger = key();
        let (_tmp, store) = store_with(&primary, &[&user]).await;
        assert_eq!(store.len(), 2);

        let digest = Hash::from_data(b"content");
        let signatures = vec![sign(&stranger, &digest), sign(&user, &digest)];

        let verified = store.verify_any(&digest, &signatures).unwrap();
        assert_eq!(verified.signature_index, 1);
        assert!(verified.key_id.ends_with("user0.pub"));

        // reordering changes the credit, not the outcome
        let reversed: Vec<String> = signatures.iter().rev().cloned().collect();
        let verified = store.verify_any(&digest, &reversed).unwrap();
        assert_eq!(verified.signature_index, 0);
    }

    #[tokio::test]
    async fn test_no_signature_verified() {
        let primary = key();
        let stranger = key();
        let (_tmp, store) = store_with(&primary, &[]).await;

        let digest = Hash::from_data(b"content");
        let signatures = vec!["garbage".to_string(), sign(&stranger, &digest)];
        let err = store.verify_any(&digest, &signatures).unwrap_err();
        assert!(matches!(
            err,
            Error::Signing(SigningError::NoSignatureVerified {
                signatures: 2,
                keys: 1
            })
        ));

        assert!(store.verify_any(&digest, &[]).is_err());
    }

    #[tokio::test]
    async fn test_missing_keys_dir_and_bad_primary() {
        let tmp = TempDir::new().unwrap();
        let primary = key();
        let primary_path = tmp.path().join("primary.pub");
        fs::write(&primary_path, primary.pk.to_box().unwrap().into_string())
            .await
            .unwrap();

        let store = TrustStore::load(&primary_path, &tmp.path().join("absent"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let digest = Hash::from_data(b"manifest");
        store
            .verify_any(&digest, &[sign(&primary, &digest)])
            .unwrap();

        let err = TrustStore::load(&tmp.path().join("nope.pub"), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Signing(SigningError::KeyLoadFailed { .. })
        ));
    }
}
