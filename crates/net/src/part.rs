//! Single-part download with skip-if-present and source fallback

use crate::auth::authenticated_request;
use crate::client::transport_error;
use crate::files::create_private;
use futures::StreamExt;
use pkgfetch_errors::{Error, PartError};
use pkgfetch_events::{EventEmitter, FetchEvent};
use pkgfetch_types::{Credentials, PartSource};
use reqwest::{Client, StatusCode};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

/// How a successful part fetch was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartFetch {
    /// A file of the expected size was already present; no request was made
    AlreadyPresent,
    /// Downloaded from the given resolved URL
    Downloaded { url: String },
}

#[derive(Debug)]
struct SourceFailure {
    url: String,
    status: Option<u16>,
    reason: String,
}

/// Download one part to `part_path`
///
/// An existing file whose size equals `expected_bytes` is accepted without
/// any request; content checks are the caller's job. Any other existing file
/// is discarded. Sources are tried in order, each once: a transport error,
/// a non-200 status, or a body that is not exactly `expected_bytes` long
/// moves on to the next source. The first complete download wins.
///
/// # Errors
///
/// When every source fails the last failure decides the error: 401 or 403
/// yields `PartError::Unauthorized`, anything else
/// `PartError::SourcesExhausted`. An empty source list yields
/// `PartError::NoSources`. Local I/O failures are returned as they occur.
pub async fn fetch_part(
    client: &Client,
    credentials: &Credentials,
    package_base_url: &str,
    part_path: &Path,
    expected_bytes: u64,
    sources: &[PartSource],
    events: &impl EventEmitter,
) -> Result<PartFetch, Error> {
    let label = part_label(part_path);

    match fs::metadata(part_path).await {
        Ok(meta) if meta.is_file() && meta.len() == expected_bytes => {
            debug!(path = %part_path.display(), bytes = expected_bytes, "part already present, skipping download");
            events.emit(FetchEvent::PartSkipped {
                part: label,
                path: part_path.to_path_buf(),
            });
            return Ok(PartFetch::AlreadyPresent);
        }
        Ok(meta) => {
            debug!(
                path = %part_path.display(),
                found = meta.len(),
                expected = expected_bytes,
                "discarding stale part file"
            );
            fs::remove_file(part_path)
                .await
                .map_err(|e| Error::io_with_path(&e, part_path))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %part_path.display(), error = %e, "cannot stat part file, recreating");
            if let Err(e) = fs::remove_file(part_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(Error::io_with_path(&e, part_path));
                }
            }
        }
    }

    let mut file = create_private(part_path)
        .await
        .map_err(|e| Error::io_with_path(&e, part_path))?;

    let mut last_failure: Option<SourceFailure> = None;

    for source in sources {
        let url = source.resolve(package_base_url);

        match download_source(client, credentials, &url, expected_bytes, &mut file, part_path)
            .await?
        {
            Ok(bytes) => {
                file.flush()
                    .await
                    .map_err(|e| Error::io_with_path(&e, part_path))?;
                debug!(path = %part_path.display(), %url, bytes, "part downloaded");
                events.emit(FetchEvent::PartDownloaded {
                    part: label,
                    url: url.clone(),
                    bytes,
                });
                return Ok(PartFetch::Downloaded { url });
            }
            Err(failure) => {
                warn!(
                    path = %part_path.display(),
                    url = %failure.url,
                    status = ?failure.status,
                    reason = %failure.reason,
                    "part source failed"
                );
                events.emit_source_failed(
                    label.clone(),
                    failure.url.clone(),
                    failure.status,
                    failure.reason.clone(),
                );
                reset(&mut file)
                    .await
                    .map_err(|e| Error::io_with_path(&e, part_path))?;
                last_failure = Some(failure);
            }
        }
    }

    let path = part_path.display().to_string();
    Err(match last_failure {
        Some(SourceFailure {
            url,
            status: Some(status @ (401 | 403)),
            ..
        }) => PartError::Unauthorized { path, url, status },
        Some(SourceFailure { url, reason, .. }) => PartError::SourcesExhausted { path, url, reason },
        None => PartError::NoSources { path },
    }
    .into())
}

/// Try a single source
///
/// The outer error is a local write failure and aborts the part. The inner
/// error is a failure of this source only.
async fn download_source(
    client: &Client,
    credentials: &Credentials,
    url: &str,
    expected_bytes: u64,
    file: &mut File,
    part_path: &Path,
) -> Result<Result<u64, SourceFailure>, Error> {
    let request = authenticated_request(client, url, credentials)?;

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            return Ok(Err(SourceFailure {
                url: url.to_string(),
                status: None,
                reason: transport_error(url, &e).to_string(),
            }))
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        return Ok(Err(SourceFailure {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: format!("unexpected status {status}"),
        }));
    }

    let mut stream = response.bytes_stream();
    let mut copied = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                return Ok(Err(SourceFailure {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    reason: transport_error(url, &e).to_string(),
                }))
            }
        };

        copied += chunk.len() as u64;
        if copied > expected_bytes {
            break;
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, part_path))?;
    }

    if copied != expected_bytes {
        return Ok(Err(SourceFailure {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: if copied > expected_bytes {
                format!("received more than the expected {expected_bytes} bytes")
            } else {
                format!("received {copied} bytes, expected {expected_bytes}")
            },
        }));
    }

    Ok(Ok(copied))
}

async fn reset(file: &mut File) -> std::io::Result<()> {
    file.set_len(0).await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(())
}

fn part_label(part_path: &Path) -> String {
    part_path.file_name().map_or_else(
        || part_path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
