//! Manifest retrieval: fetch, verify, decode, persist

use crate::auth::authenticated_request;
use crate::client::transport_error;
use crate::files::create_private;
use pkgfetch_errors::{Error, ManifestError};
use pkgfetch_events::{EventEmitter, FetchEvent};
use pkgfetch_hash::Hash;
use pkgfetch_signing::TrustStore;
use pkgfetch_types::{Credentials, Manifest};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Fetch the manifest at `manifest_url` and return it once trusted
///
/// The manifest has exactly one source and is never retried. Only a 200
/// response is accepted. The raw body is hashed and `signature` must verify
/// over that digest under the trust store before the body is decoded. The
/// raw bytes are written to `<destination_dir>/<id>.json` only after a
/// successful decode, so nothing unverified or unparsable is ever persisted.
///
/// # Errors
///
/// Returns a `ManifestError` for transport failures, a non-200 status, a
/// signature that does not verify, an undecodable body, or a failed write.
pub async fn fetch_manifest(
    client: &Client,
    credentials: &Credentials,
    trust: &TrustStore,
    manifest_url: &str,
    signature: &str,
    destination_dir: &Path,
    events: &impl EventEmitter,
) -> Result<Manifest, Error> {
    let request = authenticated_request(client, manifest_url, credentials)?;

    let response = client.execute(request).await.map_err(|e| ManifestError::FetchFailed {
        url: manifest_url.to_string(),
        message: transport_error(manifest_url, &e).to_string(),
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ManifestError::UnexpectedStatus {
            url: manifest_url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    let body = response.bytes().await.map_err(|e| ManifestError::FetchFailed {
        url: manifest_url.to_string(),
        message: transport_error(manifest_url, &e).to_string(),
    })?;
    debug!(url = %manifest_url, bytes = body.len(), "manifest received");
    events.emit(FetchEvent::ManifestFetched {
        url: manifest_url.to_string(),
        bytes: body.len() as u64,
    });

    let digest = Hash::from_data(&body);
    let verified = trust
        .verify_any(&digest, &[signature.to_string()])
        .map_err(|e| ManifestError::VerificationFailed {
            url: manifest_url.to_string(),
            reason: e.to_string(),
        })?;
    info!(url = %manifest_url, key = %verified.key_id, "manifest signature verified");
    events.emit(FetchEvent::ManifestVerified {
        url: manifest_url.to_string(),
        key_id: verified.key_id,
    });

    let manifest = Manifest::from_json(&body, manifest_url)?;

    let path = destination_dir.join(manifest.file_name());
    persist(&path, &body).await.map_err(|e| ManifestError::PersistFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    debug!(id = %manifest.id, path = %path.display(), "manifest persisted");
    events.emit(FetchEvent::ManifestPersisted {
        id: manifest.id.clone(),
        path,
    });

    Ok(manifest)
}

async fn persist(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = create_private(path).await?;
    file.write_all(body).await?;
    file.flush().await
}
