//! Loading and refreshing the trusted signing keys.

mod common;

use common::TEST_JWKS;
use drinks_service::auth::{spawn_refresh, KeyError, KeySource, KeyStore, SigningKeys};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn jwks_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn loads_keys_from_file() {
    let file = jwks_file(TEST_JWKS);
    let source = KeySource::File(file.path().to_path_buf());

    let keys = source.load(&reqwest::Client::new()).await.unwrap();

    assert_eq!(keys.len(), 1);
    assert!(keys.get("test-key").is_some());
}

#[tokio::test]
async fn loads_keys_from_inline_json() {
    let source = KeySource::Inline(TEST_JWKS.to_string());

    let keys = source.load(&reqwest::Client::new()).await.unwrap();

    assert_eq!(keys.len(), 1);
    assert!(keys.get("test-key").is_some());
}

#[tokio::test]
async fn inline_json_without_keys_is_rejected() {
    let source = KeySource::Inline(r#"{"keys": []}"#.to_string());

    let err = source.load(&reqwest::Client::new()).await.err().unwrap();

    assert!(matches!(err, KeyError::Empty));
}

#[tokio::test]
async fn missing_file_is_a_read_error() {
    let source = KeySource::File("/nonexistent/jwks.json".into());

    let err = source.load(&reqwest::Client::new()).await.err().unwrap();

    assert!(matches!(err, KeyError::Read { .. }));
}

#[test]
fn jwks_without_usable_keys_is_rejected() {
    let err = SigningKeys::from_json(r#"{"keys": []}"#).err().unwrap();
    assert!(matches!(err, KeyError::Empty));

    let only_symmetric = r#"{"keys": [{"kty": "oct", "kid": "hmac", "k": "c2VjcmV0"}]}"#;
    let err = SigningKeys::from_json(only_symmetric).err().unwrap();
    assert!(matches!(err, KeyError::Empty));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let err = SigningKeys::from_json("{not json").err().unwrap();
    assert!(matches!(err, KeyError::Parse(_)));
}

#[tokio::test]
async fn refresh_swaps_in_new_keys_and_survives_failures() {
    let file = jwks_file(TEST_JWKS);
    let source = KeySource::File(file.path().to_path_buf());
    let client = reqwest::Client::new();

    let store = Arc::new(KeyStore::new(source.load(&client).await.unwrap()));
    let first_load = store.current().loaded_at();

    std::fs::write(file.path(), TEST_JWKS.replace("test-key", "rotated-key")).unwrap();
    let task = spawn_refresh(
        store.clone(),
        source.clone(),
        client.clone(),
        Duration::from_millis(50),
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    let refreshed = store.current();
    assert!(refreshed.get("rotated-key").is_some());
    assert!(refreshed.get("test-key").is_none());
    assert!(refreshed.loaded_at() >= first_load);

    std::fs::write(file.path(), "{broken").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(store.current().get("rotated-key").is_some());
    task.abort();
}
