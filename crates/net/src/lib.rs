#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for pkgfetch
//!
//! This crate handles every HTTP interaction of a package fetch: client
//! construction, credential matching, the signed manifest download and
//! single-part downloads with source fallback.

mod auth;
mod client;
mod files;
mod manifest;
mod part;

pub use auth::authenticated_request;
pub use client::{ClientFactory, NetClientFactory, NetConfig};
pub use manifest::fetch_manifest;
pub use part::{fetch_part, PartFetch};

/// Base URL that `/`-prefixed part sources are resolved against
///
/// This is the manifest URL with its final `/`-separated segment removed.
#[must_use]
pub fn package_base_url(manifest_url: &str) -> &str {
    manifest_url
        .rfind('/')
        .map_or(manifest_url, |idx| &manifest_url[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_base_url() {
        assert_eq!(
            package_base_url("https://host/pkgs/edge/manifest.json"),
            "https://host/pkgs/edge"
        );
        assert_eq!(
            package_base_url("http://127.0.0.1:8080/m.json"),
            "http://127.0.0.1:8080"
        );
        assert_eq!(package_base_url("manifest.json"), "manifest.json");
    }
}
