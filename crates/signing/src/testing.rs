//! Helpers for tests that need real keys and signatures

use minisign::{KeyPair, PublicKey, SecretKey};
use pkgfetch_hash::Hash;
use std::io::Cursor;

/// A freshly generated minisign keypair
pub struct TestKey {
    pub pk: PublicKey,
    pub sk: SecretKey,
}

impl TestKey {
    /// Generate an unencrypted keypair
    ///
    /// # Panics
    /// Panics if key generation fails.
    #[must_use]
    pub fn generate() -> Self {
        let KeyPair { pk, sk } =
            KeyPair::generate_unencrypted_keypair().expect("generate minisign keypair");
        Self { pk, sk }
    }

    /// Public key in bare base64 form, as written to a trusted key file
    #[must_use]
    pub fn public_base64(&self) -> String {
        self.pk.to_base64()
    }

    /// Detached signature over the SHA-256 digest of `content`
    ///
    /// # Panics
    /// Panics if signing fails.
    #[must_use]
    pub fn sign_content(&self, content: &[u8]) -> String {
        self.sign_digest(&Hash::from_data(content))
    }

    /// Detached signature over a digest
    ///
    /// # Panics
    /// Panics if signing fails.
    #[must_use]
    pub fn sign_digest(&self, digest: &Hash) -> String {
        minisign::sign(None, &self.sk, Cursor::new(digest.as_bytes()), None, None)
            .expect("sign digest")
            .into_string()
    }
}
