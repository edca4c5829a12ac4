//! Tests for the HTTP directory adapter against a local axum server.

use std::sync::Arc;
use std::time::Duration;

use accountd::{
    AccountProvider, AccountStore, DirectoryClient, HttpDirectoryClient,
    directory::DirectoryError,
};
use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;

use crate::helpers::*;

async fn accounts() -> Json<serde_json::Value> {
    Json(json!({
        "users": expected_users(),
        "groups": expected_groups(),
    }))
}

async fn authorized_keys(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "user1" => Json(json!({ "keys": user1_keys() })).into_response(),
        "garbled" => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serve a fake directory under `/v1` and a failing one under `/broken`.
/// Returns the server's base URL.
async fn start_directory() -> String {
    let app = Router::new()
        .route("/v1/accounts", get(accounts))
        .route("/v1/users/{name}/authorized-keys", get(authorized_keys))
        .route("/broken/accounts", get(broken))
        .route("/broken/users/{name}/authorized-keys", get(broken));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> HttpDirectoryClient {
    HttpDirectoryClient::new(base, Duration::from_secs(5)).expect("Failed to build client")
}

#[tokio::test]
async fn test_http_fetch_accounts() {
    let base = start_directory().await;
    let client = client(&format!("{base}/v1"));

    let (users, groups) = client.fetch_accounts().await.unwrap();
    assert_eq!(users, expected_users());
    assert_eq!(groups, expected_groups());
}

#[tokio::test]
async fn test_http_fetch_authorized_keys() {
    let base = start_directory().await;
    let client = client(&format!("{base}/v1/"));

    assert_eq!(client.fetch_authorized_keys("user1").await.unwrap(), user1_keys());
    // A 404 means the user has no keys
    assert!(client.fetch_authorized_keys("user2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_http_error_status() {
    let base = start_directory().await;
    let client = client(&format!("{base}/broken"));

    let err = client.fetch_accounts().await.unwrap_err();
    assert!(err.is_directory_error());
    assert!(matches!(
        err,
        accountd::Error::Directory(DirectoryError::UnexpectedStatus { status: 500, .. })
    ));

    let err = client.fetch_authorized_keys("user1").await.unwrap_err();
    assert!(matches!(
        err,
        accountd::Error::Directory(DirectoryError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_http_missing_account_listing_is_an_error() {
    let base = start_directory().await;
    let client = client(&format!("{base}/nowhere"));

    let err = client.fetch_accounts().await.unwrap_err();
    assert!(matches!(
        err,
        accountd::Error::Directory(DirectoryError::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_http_undecodable_body() {
    let base = start_directory().await;
    let client = client(&format!("{base}/v1"));

    let err = client.fetch_authorized_keys("garbled").await.unwrap_err();
    assert!(matches!(
        err,
        accountd::Error::Directory(DirectoryError::Decode { .. })
    ));
}

#[tokio::test]
async fn test_http_unreachable_directory() {
    // Bind and drop to find a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client.fetch_accounts().await.unwrap_err();
    match err {
        accountd::Error::Directory(dir_err) => assert!(dir_err.is_network_error()),
        other => panic!("expected a directory error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_store_over_http() {
    let base = start_directory().await;
    let client = Arc::new(client(&format!("{base}/v1")));
    let store = AccountStore::start(client, quiet_config()).await;

    assert!(store.status().ready);
    assert_eq!(store.users(), expected_users());
    assert_eq!(store.user_by_uid(4002).await.unwrap().name, "user2");
    assert_eq!(store.authorized_keys("user1").await.unwrap(), user1_keys());
    assert!(store.authorized_keys("user2").await.unwrap().is_empty());
    assert_eq!(store.status().key_records, 2);
}
