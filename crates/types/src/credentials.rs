//! Basic-auth credential table keyed by URL prefix

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A username/password pair applied as HTTP Basic authentication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credential {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether both username and password are present
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Mapping from URL prefix to the credential used for URLs under it
///
/// Lookup is deterministic: prefixes are considered longest first, ties
/// broken lexicographically, and the first matching prefix with a usable
/// credential wins. Entries with an empty username or password never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    entries: HashMap<String, Credential>,
}

impl Credentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, credential: Credential) {
        self.entries.insert(prefix.into(), credential);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Find the credential that applies to `url`, with the prefix it matched
    #[must_use]
    pub fn for_url(&self, url: &str) -> Option<(&str, &Credential)> {
        let mut candidates: Vec<(&String, &Credential)> = self
            .entries
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .collect();
        candidates.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        candidates
            .into_iter()
            .find(|(_, credential)| credential.is_usable())
            .map(|(prefix, credential)| (prefix.as_str(), credential))
    }
}

impl<K: Into<String>> FromIterator<(K, Credential)> for Credentials {
    fn from_iter<T: IntoIterator<Item = (K, Credential)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
