//! Content verification of a downloaded part

use pkgfetch_errors::{Error, PartError};
use pkgfetch_hash::Hash;
use pkgfetch_signing::{TrustStore, VerifiedBy};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Check a part file against its expected digest and signatures
///
/// On a digest mismatch the file is deleted (best effort) so the next run
/// downloads it again. A file with the right digest but no verifying
/// signature is left in place.
///
/// # Errors
///
/// Returns `PartError::HashMismatch` or `PartError::SignatureRejected`, or an
/// I/O error if the file cannot be read.
pub async fn verify_part(
    trust: &TrustStore,
    part_path: &Path,
    expected_hash: &str,
    signatures: &[String],
) -> Result<VerifiedBy, Error> {
    let actual = Hash::hash_file(part_path).await?;

    if !actual.matches_hex(expected_hash) {
        if let Err(e) = fs::remove_file(part_path).await {
            warn!(path = %part_path.display(), error = %e, "failed to delete part after hash mismatch");
        }
        return Err(PartError::HashMismatch {
            path: part_path.display().to_string(),
            expected: expected_hash.to_string(),
            actual: actual.to_hex(),
        }
        .into());
    }

    let verified = trust.verify_any(&actual, signatures).map_err(|e| {
        PartError::SignatureRejected {
            path: part_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    debug!(
        path = %part_path.display(),
        key = %verified.key_id,
        signature = verified.signature_index,
        "part verified"
    );
    Ok(verified)
}
