//! Authenticated request construction

use pkgfetch_errors::{Error, NetworkError};
use pkgfetch_types::Credentials;
use reqwest::{Client, Request};
use tracing::trace;

/// Build a GET request for `url`, attaching HTTP Basic auth when a
/// credential prefix matches
///
/// # Errors
///
/// Returns an error if the request cannot be built, e.g. for a malformed URL.
pub fn authenticated_request(
    client: &Client,
    url: &str,
    credentials: &Credentials,
) -> Result<Request, Error> {
    let mut builder = client.get(url);

    if let Some((prefix, credential)) = credentials.for_url(url) {
        trace!(%url, %prefix, username = %credential.username, "applying basic auth");
        builder = builder.basic_auth(&credential.username, Some(&credential.password));
    }

    builder.build().map_err(|e| {
        NetworkError::RequestBuildFailed {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
