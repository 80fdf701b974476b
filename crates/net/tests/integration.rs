//! HTTP-level tests for manifest retrieval and part download

use httpmock::prelude::*;
use pkgfetch_errors::{Error, ManifestError, PartError};
use pkgfetch_events::{EventSender, FetchEvent};
use pkgfetch_hash::Hash;
use pkgfetch_net::{
    fetch_manifest, fetch_part, package_base_url, ClientFactory, NetClientFactory, PartFetch,
};
use pkgfetch_signing::testing::TestKey;
use pkgfetch_signing::TrustStore;
use pkgfetch_types::{Credential, Credentials, PartSource};
use reqwest::Client;
use tempfile::TempDir;
use tokio::fs;

const NO_EVENTS: Option<EventSender> = None;

fn client() -> Client {
    NetClientFactory::default().make_client(None).unwrap()
}

async fn trust_store(dir: &TempDir, key: &TestKey) -> TrustStore {
    let primary = dir.path().join("primary.pub");
    fs::write(&primary, key.public_base64()).await.unwrap();
    TrustStore::load(&primary, &dir.path().join("trusted.d"))
        .await
        .unwrap()
}

fn manifest_body() -> String {
    format!(
        r#"{{
            "id": "pkg-1",
            "meta": {{ "provides": {{ "images": {{ "a": {{ "repotag": "r/a:1" }} }} }} }},
            "parts": {{
                "a.bin": {{
                    "id": "a",
                    "bytes": 4,
                    "sha256sum": "{}",
                    "signatures": [],
                    "sources": [{{ "url": "/a.bin" }}]
                }}
            }}
        }}"#,
        Hash::from_data(b"aaaa").to_hex()
    )
}

#[tokio::test]
async fn test_manifest_fetched_verified_and_persisted() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let key = TestKey::generate();
    let trust = trust_store(&keys, &key).await;

    let body = manifest_body();
    let signature = key.sign_content(body.as_bytes());

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/pkgs/manifest.json");
        then.status(200).body(&body);
    });

    let (tx, mut rx) = pkgfetch_events::channel();
    let url = server.url("/pkgs/manifest.json");
    let manifest = fetch_manifest(
        &client(),
        &Credentials::new(),
        &trust,
        &url,
        &signature,
        dest.path(),
        &tx,
    )
    .await
    .unwrap();

    mock.assert();
    assert_eq!(manifest.id, "pkg-1");
    let persisted = fs::read(dest.path().join("pkg-1.json")).await.unwrap();
    assert_eq!(persisted, body.as_bytes());

    let mut verified = false;
    while let Ok(event) = rx.try_recv() {
        if let FetchEvent::ManifestVerified { key_id, .. } = event {
            assert!(key_id.ends_with("primary.pub"));
            verified = true;
        }
    }
    assert!(verified);
}

#[tokio::test]
async fn test_manifest_404_writes_nothing() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let key = TestKey::generate();
    let trust = trust_store(&keys, &key).await;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manifest.json");
        then.status(404);
    });

    let err = fetch_manifest(
        &client(),
        &Credentials::new(),
        &trust,
        &server.url("/manifest.json"),
        &key.sign_content(b"anything"),
        dest.path(),
        &NO_EVENTS,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Manifest(ManifestError::UnexpectedStatus { status: 404, .. })
    ));
    let mut entries = fs::read_dir(dest.path()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn test_manifest_persist_failure_reported() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let key = TestKey::generate();
    let trust = trust_store(&keys, &key).await;
    // a directory where the manifest file belongs cannot be opened for writing
    fs::create_dir(dest.path().join("pkg-1.json")).await.unwrap();

    let body = manifest_body();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manifest.json");
        then.status(200).body(&body);
    });

    let err = fetch_manifest(
        &client(),
        &Credentials::new(),
        &trust,
        &server.url("/manifest.json"),
        &key.sign_content(body.as_bytes()),
        dest.path(),
        &NO_EVENTS,
    )
    .await
    .unwrap_err();

    match err {
        Error::Manifest(ManifestError::PersistFailed { path, .. }) => {
            assert!(path.ends_with("pkg-1.json"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_manifest_bad_signature_not_persisted() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let trusted = TestKey::generate();
    let stranger = TestKey::generate();
    let trust = trust_store(&keys, &trusted).await;

    let body = manifest_body();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manifest.json");
        then.status(200).body(&body);
    });

    let err = fetch_manifest(
        &client(),
        &Credentials::new(),
        &trust,
        &server.url("/manifest.json"),
        &stranger.sign_content(body.as_bytes()),
        dest.path(),
        &NO_EVENTS,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Manifest(ManifestError::VerificationFailed { .. })
    ));
    assert!(!dest.path().join("pkg-1.json").exists());
}

#[tokio::test]
async fn test_manifest_unparsable_not_persisted() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let key = TestKey::generate();
    let trust = trust_store(&keys, &key).await;

    let body = r#"{"id": "pkg-1", "parts": 7}"#;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manifest.json");
        then.status(200).body(body);
    });

    let err = fetch_manifest(
        &client(),
        &Credentials::new(),
        &trust,
        &server.url("/manifest.json"),
        &key.sign_content(body.as_bytes()),
        dest.path(),
        &NO_EVENTS,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Manifest(ManifestError::ParseFailed { .. })));
    assert!(!dest.path().join("pkg-1.json").exists());
}

#[tokio::test]
async fn test_manifest_uses_basic_auth() {
    let keys = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let key = TestKey::generate();
    let trust = trust_store(&keys, &key).await;

    let body = manifest_body();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/manifest.json")
            .header("authorization", "Basic ZWRnZTpzZWNyZXQ=");
        then.status(200).body(&body);
    });

    let mut credentials = Credentials::new();
    credentials.insert(server.base_url(), Credential::new("edge", "secret"));

    fetch_manifest(
        &client(),
        &credentials,
        &trust,
        &server.url("/manifest.json"),
        &key.sign_content(body.as_bytes()),
        dest.path(),
        &NO_EVENTS,
    )
    .await
    .unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_part_falls_back_to_next_source() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(GET).path("/pkgs/b.bin");
        then.status(500);
    });
    let mirror = server.mock(|when, then| {
        when.method(GET).path("/mirror/b.bin");
        then.status(200).body("bbbbbb");
    });

    let path = dest.path().join("b.bin");
    let base = server.url("/pkgs");
    let sources = vec![
        PartSource::new("/b.bin"),
        PartSource::new(server.url("/mirror/b.bin")),
    ];

    let outcome = fetch_part(
        &client(),
        &Credentials::new(),
        &base,
        &path,
        6,
        &sources,
        &NO_EVENTS,
    )
    .await
    .unwrap();

    failing.assert();
    mirror.assert();
    assert_eq!(
        outcome,
        PartFetch::Downloaded {
            url: server.url("/mirror/b.bin")
        }
    );
    assert_eq!(fs::read(&path).await.unwrap(), b"bbbbbb");
}

#[tokio::test]
async fn test_part_wrong_size_moves_on() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    let short = server.mock(|when, then| {
        when.method(GET).path("/short");
        then.status(200).body("abc");
    });
    let long = server.mock(|when, then| {
        when.method(GET).path("/long");
        then.status(200).body("abcdefgh");
    });
    let good = server.mock(|when, then| {
        when.method(GET).path("/good");
        then.status(200).body("abcd");
    });

    let path = dest.path().join("p");
    let sources = vec![
        PartSource::new(server.url("/short")),
        PartSource::new(server.url("/long")),
        PartSource::new(server.url("/good")),
    ];
    fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &path,
        4,
        &sources,
        &NO_EVENTS,
    )
    .await
    .unwrap();

    short.assert();
    long.assert();
    good.assert();
    assert_eq!(fs::read(&path).await.unwrap(), b"abcd");
}

#[tokio::test]
async fn test_part_present_with_expected_size_is_skipped() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/p");
        then.status(200).body("new!");
    });

    let path = dest.path().join("p");
    fs::write(&path, b"old!").await.unwrap();

    let outcome = fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &path,
        4,
        &[PartSource::new(server.url("/p"))],
        &NO_EVENTS,
    )
    .await
    .unwrap();

    assert_eq!(outcome, PartFetch::AlreadyPresent);
    mock.assert_hits(0);
    assert_eq!(fs::read(&path).await.unwrap(), b"old!");
}

#[tokio::test]
async fn test_part_present_with_wrong_size_is_refetched() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/p");
        then.status(200).body("fresh");
    });

    let path = dest.path().join("p");
    fs::write(&path, b"stale content").await.unwrap();

    fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &path,
        5,
        &[PartSource::new(server.url("/p"))],
        &NO_EVENTS,
    )
    .await
    .unwrap();

    mock.assert();
    assert_eq!(fs::read(&path).await.unwrap(), b"fresh");
}

#[tokio::test]
async fn test_part_auth_failure_distinct_from_server_failure() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/forbidden");
        then.status(403);
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500);
    });

    let err = fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &dest.path().join("f"),
        4,
        &[PartSource::new(server.url("/forbidden"))],
        &NO_EVENTS,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Part(PartError::Unauthorized { status: 403, .. })
    ));

    let err = fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &dest.path().join("b"),
        4,
        &[PartSource::new(server.url("/broken"))],
        &NO_EVENTS,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Part(PartError::SourcesExhausted { .. })
    ));
}

#[tokio::test]
async fn test_last_failure_decides_classification() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/forbidden");
        then.status(401);
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(503);
    });

    let (tx, mut rx) = pkgfetch_events::channel();
    let err = fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &dest.path().join("p"),
        4,
        &[
            PartSource::new(server.url("/forbidden")),
            PartSource::new(server.url("/broken")),
        ],
        &tx,
    )
    .await
    .unwrap_err();

    match err {
        Error::Part(PartError::SourcesExhausted { url, .. }) => {
            assert_eq!(url, server.url("/broken"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut failed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let FetchEvent::SourceFailed { status, .. } = event {
            failed.push(status);
        }
    }
    assert_eq!(failed, vec![Some(401), Some(503)]);
}

#[tokio::test]
async fn test_no_sources() {
    let dest = TempDir::new().unwrap();
    let err = fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &dest.path().join("p"),
        4,
        &[],
        &NO_EVENTS,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Part(PartError::NoSources { .. })));
}

#[tokio::test]
async fn test_part_transport_error_moves_on() {
    let dest = TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/p");
        then.status(200).body("abcd");
    });

    // nothing listens on port 9 of the loopback interface
    fetch_part(
        &client(),
        &Credentials::new(),
        "",
        &dest.path().join("p"),
        4,
        &[
            PartSource::new("http://127.0.0.1:9/p"),
            PartSource::new(server.url("/p")),
        ],
        &NO_EVENTS,
    )
    .await
    .unwrap();
    mock.assert();
}

#[test]
fn test_base_url_resolution_matches_sources() {
    let base = package_base_url("https://host/pkgs/manifest.json");
    assert_eq!(
        PartSource::new("/a.bin").resolve(base),
        "https://host/pkgs/a.bin"
    );
}
