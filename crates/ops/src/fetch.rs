//! Top-level package fetch

use crate::parts::fetch_all_parts;
use crate::OpsCtx;
use pkgfetch_config::FetchConfig;
use pkgfetch_errors::{ConfigError, Error, StorageError};
use pkgfetch_events::{EventEmitter, FailureContext, FetchEvent};
use pkgfetch_net::{fetch_manifest, package_base_url};
use pkgfetch_signing::TrustStore;
use pkgfetch_types::Credentials;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::DirBuilder;
use tracing::{debug, info};

/// Inputs of a single package fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub manifest_url: String,
    /// Must be non-empty; manifest verification cannot be turned off
    pub manifest_signature: String,
    pub destination_dir: PathBuf,
    pub trusted_primary_key: PathBuf,
    pub trusted_keys_dir: PathBuf,
    pub credentials: Credentials,
}

impl From<&FetchConfig> for FetchRequest {
    fn from(config: &FetchConfig) -> Self {
        Self {
            manifest_url: config.manifest_url.clone(),
            manifest_signature: config.manifest_signature.clone(),
            destination_dir: config.destination_dir.clone(),
            trusted_primary_key: config.trusted_primary_key.clone(),
            trusted_keys_dir: config.trusted_keys_dir.clone(),
            credentials: config.credentials.clone(),
        }
    }
}

/// Fetch the signed manifest and every part it lists
///
/// Produces `<destination_dir>/<id>.json` and one file per part under
/// `<destination_dir>/<id>/`, returning the absolute part paths in part-name
/// order. Nothing is returned for a partially successful fetch.
///
/// # Errors
///
/// Returns `ConfigError::MissingManifestSignature` before any I/O for an
/// empty signature. Manifest-stage failures abort before any part is
/// fetched. Part failures are collected into `Error::Parts`.
pub async fn fetch_package(ctx: &OpsCtx, request: &FetchRequest) -> Result<Vec<PathBuf>, Error> {
    if request.manifest_signature.trim().is_empty() {
        return Err(ConfigError::MissingManifestSignature.into());
    }

    ctx.emit(FetchEvent::FetchStarted {
        manifest_url: request.manifest_url.clone(),
        destination: request.destination_dir.clone(),
    });

    let result = run_fetch(ctx, request).await;

    match &result {
        Ok((id, paths)) => {
            info!(%id, parts = paths.len(), "package fetched");
            ctx.emit(FetchEvent::FetchCompleted {
                id: id.clone(),
                parts: paths.len(),
            });
        }
        Err(e) => ctx.emit(FetchEvent::FetchFailed {
            failed: e.part_failures().map_or(1, pkgfetch_errors::PartFailures::len),
            failure: FailureContext::from_error(e),
        }),
    }

    result.map(|(_, paths)| paths)
}

async fn run_fetch(ctx: &OpsCtx, request: &FetchRequest) -> Result<(String, Vec<PathBuf>), Error> {
    let destination_dir = std::path::absolute(&request.destination_dir)
        .map_err(|e| Error::io_with_path(&e, &request.destination_dir))?;
    create_private_dir(&destination_dir).await?;

    let trust = Arc::new(
        TrustStore::load(&request.trusted_primary_key, &request.trusted_keys_dir).await?,
    );

    let client = ctx.clients.make_client(None)?;
    let manifest = fetch_manifest(
        &client,
        &request.credentials,
        &trust,
        &request.manifest_url,
        &request.manifest_signature,
        &destination_dir,
        ctx,
    )
    .await?;

    manifest.precheck()?;

    let base_url = package_base_url(&request.manifest_url);
    let part_dir = destination_dir.join(&manifest.id);
    create_private_dir(&part_dir).await?;
    debug!(id = %manifest.id, parts = manifest.parts.len(), %base_url, "fetching parts");

    let paths = fetch_all_parts(
        ctx,
        Arc::new(request.credentials.clone()),
        trust,
        base_url,
        &manifest.parts,
        &part_dir,
    )
    .await?;

    Ok((manifest.id, paths))
}

/// Create `path` and missing parents with mode 0700; existing directories are kept as-is
async fn create_private_dir(path: &Path) -> Result<(), Error> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    builder.create(path).await.map_err(|e| {
        StorageError::DirectoryCreateFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
