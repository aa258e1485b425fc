use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use glsync::load_config::{is_valid_session_cookie, load_config, BEARER_TOKEN_ENV, SESSION_ENV};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A cookie shaped like the one the browser stores: `header.payload.signature`.
fn session_cookie() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"username":"tester","_auth_user_id":"42"}"#);
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[tokio::test]
#[serial]
async fn test_load_config_success_with_all_fields() {
    let file = config_file(
        r#"
repo_url: "git@github.com:example/solutions.git"
endpoint: "http://127.0.0.1:8080/graphql/"
workdir: ./tmp/work
retry:
  max_retries: 2
  backoff_ms: 250
"#,
    );
    env::set_var(SESSION_ENV, session_cookie());
    env::set_var(BEARER_TOKEN_ENV, "token-123");

    let config = load_config(Some(file.path()), None).expect("Config should load");

    assert_eq!(config.repo_url, "git@github.com:example/solutions.git");
    assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:8080/graphql/");
    assert_eq!(config.workdir, PathBuf::from("./tmp/work"));
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.retry.backoff, Duration::from_millis(250));
    assert_eq!(config.session_cookie, session_cookie());
    assert_eq!(config.bearer_token.as_deref(), Some("token-123"));

    env::remove_var(BEARER_TOKEN_ENV);
}

#[tokio::test]
#[serial]
async fn test_load_config_defaults_without_file() {
    env::set_var(SESSION_ENV, session_cookie());
    env::remove_var(BEARER_TOKEN_ENV);

    let config = load_config(None, Some("https://github.com/example/solutions.git".into()))
        .expect("Repo url override alone should be enough");

    assert_eq!(config.repo_url, "https://github.com/example/solutions.git");
    assert_eq!(config.endpoint.as_str(), "https://leetcode.com/graphql/");
    assert_eq!(config.workdir, PathBuf::from("."));
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.backoff, Duration::from_secs(1));
    assert!(config.bearer_token.is_none());
}

#[tokio::test]
#[serial]
async fn test_repo_url_flag_overrides_file() {
    let file = config_file("repo_url: \"git@github.com:example/old.git\"\n");
    env::set_var(SESSION_ENV, session_cookie());

    let config = load_config(Some(file.path()), Some("git@github.com:example/new.git".into()))
        .expect("Config should load");
    assert_eq!(config.repo_url, "git@github.com:example/new.git");
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_without_repo_url() {
    let file = config_file("workdir: ./tmp\n");
    env::set_var(SESSION_ENV, session_cookie());

    let err = load_config(Some(file.path()), Some("   ".into())).unwrap_err();
    assert!(
        err.to_string().contains("No git repository url provided"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_without_session_cookie() {
    env::remove_var(SESSION_ENV);

    let err = load_config(None, Some("git@github.com:example/solutions.git".into())).unwrap_err();
    assert!(
        err.to_string().contains("LEETCODE_SESSION environment variable not set"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_malformed_session_cookie() {
    env::set_var(SESSION_ENV, "abc.def");

    let err = load_config(None, Some("git@github.com:example/solutions.git".into())).unwrap_err();
    assert!(
        err.to_string().contains("Invalid LeetCode session cookie"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    let file = config_file("not-yaml: [:::");
    env::set_var(SESSION_ENV, session_cookie());

    let msg = load_config(Some(file.path()), None).unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_unknown_keys() {
    let file = config_file("repo_url: \"git@github.com:example/solutions.git\"\nsession: leaked\n");
    env::set_var(SESSION_ENV, session_cookie());

    assert!(load_config(Some(file.path()), None).is_err());
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_invalid_endpoint() {
    let file = config_file(
        "repo_url: \"git@github.com:example/solutions.git\"\nendpoint: \"not a url\"\n",
    );
    env::set_var(SESSION_ENV, session_cookie());

    let err = load_config(Some(file.path()), None).unwrap_err();
    assert!(err.to_string().contains("Invalid endpoint url"));
}

#[test]
fn session_cookie_validation() {
    assert!(is_valid_session_cookie(&session_cookie()));
    assert!(is_valid_session_cookie("a.e30.b"));
    // Payload decodes, but not to JSON.
    let not_json = URL_SAFE_NO_PAD.encode(b"plain text");
    assert!(!is_valid_session_cookie(&format!("a.{not_json}.b")));
    assert!(!is_valid_session_cookie("a.!!!.b"));
    assert!(!is_valid_session_cookie("only.two"));
    assert!(!is_valid_session_cookie(""));
}
