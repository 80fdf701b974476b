//! Owner-only file creation

use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Open `path` for writing, creating it with mode 0600 and truncating it
pub(crate) async fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}
