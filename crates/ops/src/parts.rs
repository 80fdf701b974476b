//! Concurrent fetch and verification of every part

use crate::verify::verify_part;
use crate::OpsCtx;
use pkgfetch_errors::{Error, PartFailures};
use pkgfetch_events::{EventEmitter, EventSender, FetchEvent};
use pkgfetch_net::{fetch_part, ClientFactory, PartFetch};
use pkgfetch_signing::TrustStore;
use pkgfetch_types::{Credentials, Part};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

const SMALL_PART_BYTES: u64 = 1024 * 1024;
const SMALL_PART_TIMEOUT: Duration = Duration::from_secs(120);
/// Assumed worst-case transfer rate for large parts, in kbit/s
const CONSERVATIVE_RATE_KBIT: u64 = 100;

/// Request time budget for a part of `bytes` bytes
///
/// Parts up to 1 MiB get a flat 120 seconds. Larger parts get the time a
/// transfer at 100 kbit/s would take.
#[must_use]
pub fn part_timeout(bytes: u64) -> Duration {
    if bytes <= SMALL_PART_BYTES {
        SMALL_PART_TIMEOUT
    } else {
        Duration::from_secs(bytes.saturating_mul(8) / 1024 / CONSERVATIVE_RATE_KBIT)
    }
}

/// Fetch and verify every part into `part_dir`
///
/// One task per part runs to completion regardless of how its siblings
/// fare; a part is verified only when its own download succeeded. The
/// caller gets the paths of all parts, in part-name order, or every
/// part's failure at once.
///
/// # Errors
///
/// Returns `Error::Parts` mapping each failed part name to its error when
/// any part fails.
pub async fn fetch_all_parts(
    ctx: &OpsCtx,
    credentials: Arc<Credentials>,
    trust: Arc<TrustStore>,
    package_base_url: &str,
    parts: &BTreeMap<String, Part>,
    part_dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    let mut tasks = JoinSet::new();
    let mut names = HashMap::with_capacity(parts.len());

    for (name, part) in parts {
        let job = PartJob {
            clients: Arc::clone(&ctx.clients),
            credentials: Arc::clone(&credentials),
            trust: Arc::clone(&trust),
            package_base_url: package_base_url.to_string(),
            path: part_dir.join(name),
            part: part.clone(),
            tx: ctx.tx.clone(),
        };
        let task_name = name.clone();
        let handle = tasks.spawn(async move {
            let result = job.run(&task_name).await;
            (task_name, result)
        });
        names.insert(handle.id(), name.clone());
    }

    let mut fetched = BTreeMap::new();
    let mut failures = PartFailures::new();

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (name, Ok(path)))) => {
                fetched.insert(name, path);
            }
            Ok((_, (name, Err(e)))) => {
                error!(part = %name, error = %e, "part failed");
                ctx.emit_part_failed(name.clone(), &e);
                failures.insert(name, e);
            }
            Err(join_error) => {
                let name = names
                    .get(&join_error.id())
                    .cloned()
                    .unwrap_or_else(|| format!("task-{}", join_error.id()));
                let e = Error::internal(format!("part task did not complete: {join_error}"));
                error!(part = %name, error = %e, "part task aborted");
                ctx.emit_part_failed(name.clone(), &e);
                failures.insert(name, e);
            }
        }
    }

    if !failures.is_empty() {
        return Err(failures.into());
    }

    info!(parts = fetched.len(), dir = %part_dir.display(), "all parts fetched and verified");
    Ok(fetched.into_values().collect())
}

/// Everything one part task owns
struct PartJob {
    clients: Arc<dyn ClientFactory>,
    credentials: Arc<Credentials>,
    trust: Arc<TrustStore>,
    package_base_url: String,
    path: PathBuf,
    part: Part,
    tx: Option<EventSender>,
}

impl PartJob {
    async fn run(self, name: &str) -> Result<PathBuf, Error> {
        let timeout = part_timeout(self.part.bytes);
        debug!(part = %name, bytes = self.part.bytes, timeout_secs = timeout.as_secs(), "starting part");
        self.tx.emit(FetchEvent::PartStarted {
            part: name.to_string(),
            expected_bytes: self.part.bytes,
            sources: self.part.sources.len(),
        });

        let client = self.clients.make_client(Some(timeout))?;

        let outcome = fetch_part(
            &client,
            &self.credentials,
            &self.package_base_url,
            &self.path,
            self.part.bytes,
            &self.part.sources,
            &self.tx,
        )
        .await?;
        if let PartFetch::Downloaded { url } = &outcome {
            debug!(part = %name, %url, "part downloaded, verifying");
        }

        let verified = verify_part(
            &self.trust,
            &self.path,
            &self.part.sha256sum,
            &self.part.signatures,
        )
        .await?;
        self.tx.emit(FetchEvent::PartVerified {
            part: name.to_string(),
            key_id: verified.key_id,
        });

        Ok(self.path)
    }
}
