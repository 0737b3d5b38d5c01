mod common;

use common::*;
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use v2ctl::api::ApiClient;
use v2ctl::cli::{authenticate, AuthKind};
use v2ctl::config::ConfigStore;
use v2ctl::Error;

#[test]
fn rejected_login_writes_nothing() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("cfg.json"));
    let api = ApiClient::new(Scripted::default().fail("wrong password"), None);

    let err = authenticate(&api, &store, AuthKind::Login, "admin", "nope").unwrap_err();

    assert!(matches!(err, Error::Rejected { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(!store.path().exists());
}

#[test]
fn http_error_on_login_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    fs::write(&path, r#"{"token":"previous"}"#).unwrap();
    let store = ConfigStore::new(&path);
    let api = ApiClient::new(Scripted::default().raw(401, String::new()), None);

    let err = authenticate(&api, &store, AuthKind::Login, "admin", "pw").unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert_eq!(store.load().token.as_deref(), Some("previous"));
}

#[test]
fn successful_login_persists_token() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("cfg.json"));
    let api = ApiClient::new(Scripted::default().reply(json!({"token": "t0k"})), None);

    authenticate(&api, &store, AuthKind::Login, "admin", "pw").unwrap();

    assert_eq!(store.load().token.as_deref(), Some("t0k"));
    let sent = api.transport().requests();
    assert_eq!(sent[0].operation, "login");
    assert_eq!(sent[0].token, None);
}

#[test]
fn account_creation_uses_account_endpoint() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("cfg.json"));
    let api = ApiClient::new(Scripted::default().reply(json!({"token": "first"})), None);

    authenticate(&api, &store, AuthKind::Account, "root", "pw").unwrap();

    assert_eq!(api.transport().calls(), ["POST account"]);
    assert_eq!(body(api.transport(), 0), json!({"username": "root", "password": "pw"}));
    assert_eq!(store.load().token.as_deref(), Some("first"));
}

#[test]
fn stored_token_is_sent_as_authorization() {
    let api = client(Scripted::default().reply(json!({"version": "2.2.5"})));

    let version = api.version().unwrap();

    assert_eq!(version["version"], json!("2.2.5"));
    assert_eq!(api.transport().requests()[0].token.as_deref(), Some("token"));
}
