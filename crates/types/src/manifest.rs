//! Package manifest (`<id>.json`) types
//!
//! A manifest identifies a fetchable bundle and describes each of its parts:
//! the exact size, the SHA-256 digest, detached signatures over that digest
//! and the ordered list of places the part can be downloaded from.

use pkgfetch_errors::{Error, ManifestError, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Signed top-level descriptor of a multi-part bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique identifier; names the persisted manifest file and the part directory
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub meta: Meta,
    /// Parts keyed by name; the name is used verbatim as the local file name
    #[serde(default)]
    pub parts: BTreeMap<String, Part>,
}

/// Descriptive metadata about the bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub provides: Provides,
}

/// What the bundle provides, keyed by part id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provides {
    #[serde(default)]
    pub images: HashMap<String, ProvidedImage>,
}

/// Descriptive record for a provided container image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidedImage {
    #[serde(default, alias = "repotag", skip_serializing_if = "Option::is_none")]
    pub repo_tag: Option<String>,
}

/// One addressable unit of bundle content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    /// Exact expected size; the only "download complete" signal
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the complete content
    pub sha256sum: String,
    /// Detached signatures over the digest; any one verifying is enough
    #[serde(default)]
    pub signatures: Vec<String>,
    /// Tried in order, first success wins
    #[serde(default)]
    pub sources: Vec<PartSource>,
}

/// A location a part can be downloaded from
///
/// A `url` beginning with `/` is resolved against the manifest's own base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSource {
    pub url: String,
}

impl PartSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Resolve this source against the package base URL
    #[must_use]
    pub fn resolve(&self, package_base_url: &str) -> String {
        if self.url.starts_with('/') {
            format!("{package_base_url}{}", self.url)
        } else {
            self.url.clone()
        }
    }
}

impl Manifest {
    /// Decode a manifest from raw JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::ParseFailed` if the body is not a valid manifest
    /// or its id cannot be used as a file name.
    pub fn from_json(content: &[u8], url: &str) -> Result<Self, Error> {
        let manifest: Self =
            serde_json::from_slice(content).map_err(|e| ManifestError::ParseFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !is_plain_file_name(&manifest.id) {
            return Err(ManifestError::ParseFailed {
                url: url.to_string(),
                message: format!("manifest id {:?} is not a plain file name", manifest.id),
            }
            .into());
        }

        Ok(manifest)
    }

    /// File name the raw manifest is persisted under
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }

    /// Check that the manifest can be fetched before any part download starts
    ///
    /// Every part must have a matching `meta.provides.images` entry for its
    /// `id`, and every part name must be usable as a plain file name.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::PrecheckFailed` for the first part lacking
    /// metadata, or `StorageError::InvalidPath` for an unusable part name.
    pub fn precheck(&self) -> Result<(), Error> {
        if !is_plain_file_name(&self.id) {
            return Err(StorageError::InvalidPath {
                path: self.id.clone(),
            }
            .into());
        }

        for (name, part) in &self.parts {
            if !is_plain_file_name(name) {
                return Err(StorageError::InvalidPath { path: name.clone() }.into());
            }

            let Some(image) = self.meta.provides.images.get(&part.id) else {
                return Err(ManifestError::PrecheckFailed {
                    part_id: part.id.clone(),
                    part: name.clone(),
                }
                .into());
            };

            debug!(
                part = %name,
                part_id = %part.id,
                repo_tag = ?image.repo_tag,
                "precheck passed, part will be fetched"
            );
        }

        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "id": "netspeed-1.0",
        "version": "1.0.0",
        "meta": {
            "provides": {
                "images": {
                    "netspeed_amd64": { "repotag": "summit.hovitos.engineering/x86/netspeed:1.0" }
                }
            }
        },
        "parts": {
            "netspeed_amd64.tar.gz": {
                "id": "netspeed_amd64",
                "bytes": 512000,
                "sha256sum": "0f343b0931126a20f133d67c2b018a3b1e0a3d1b5ffb06e5a1e1b3bd8a36d3a1",
                "signatures": ["sig"],
                "sources": [
                    { "url": "/parts/netspeed_amd64.tar.gz" },
                    { "url": "https://mirror.example.com/netspeed_amd64.tar.gz" }
                ]
            }
        },
        "unknown_field": true
    }"#;

    #[test]
    fn test_decode_manifest() {
        let manifest = Manifest::from_json(MANIFEST.as_bytes(), "https://h/m.json").unwrap();
        assert_eq!(manifest.id, "netspeed-1.0");
        assert_eq!(manifest.file_name(), "netspeed-1.0.json");
        let part = &manifest.parts["netspeed_amd64.tar.gz"];
        assert_eq!(part.bytes, 512_000);
        assert_eq!(part.sources.len(), 2);
        assert_eq!(
            manifest.meta.provides.images["netspeed_amd64"]
                .repo_tag
                .as_deref(),
            Some("summit.hovitos.engineering/x86/netspeed:1.0")
        );
        manifest.precheck().unwrap();
    }

    #[test]
    fn test_decode_failure_is_parse_error() {
        let err = Manifest::from_json(b"{not json", "https://h/m.json").unwrap_err();
        assert!(matches!(
            err,
            Error::Manifest(ManifestError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_path_like_id() {
        let body = MANIFEST.replace("netspeed-1.0", "../netspeed");
        assert!(matches!(
            Manifest::from_json(body.as_bytes(), "u"),
            Err(Error::Manifest(ManifestError::ParseFailed { .. }))
        ));
    }

    #[test]
    fn test_precheck_missing_provides() {
        let mut manifest = Manifest::from_json(MANIFEST.as_bytes(), "u").unwrap();
        manifest.meta.provides.images.clear();
        let err = manifest.precheck().unwrap_err();
        match err {
            Error::Manifest(ManifestError::PrecheckFailed { part_id, part }) => {
                assert_eq!(part_id, "netspeed_amd64");
                assert_eq!(part, "netspeed_amd64.tar.gz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_precheck_rejects_path_like_names() {
        let mut manifest = Manifest::from_json(MANIFEST.as_bytes(), "u").unwrap();
        let part = manifest.parts["netspeed_amd64.tar.gz"].clone();
        manifest.parts.insert("../escape".to_string(), part);
        assert!(matches!(
            manifest.precheck(),
            Err(Error::Storage(StorageError::InvalidPath { .. }))
        ));
    }

    #[test]
    fn test_source_resolution() {
        let base = "https://host/pkgs";
        assert_eq!(
            PartSource::new("/p/a.tar").resolve(base),
            "https://host/pkgs/p/a.tar"
        );
        assert_eq!(
            PartSource::new("https://cdn/a.tar").resolve(base),
            "https://cdn/a.tar"
        );
    }
}
