use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use glsync_core::leetcode::{HttpTransport, LeetCodeClient, QueryTemplates, QueryTransport, RetryPolicy};
use glsync_core::Url;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct CaptureState {
    reqs: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
    status: Arc<Mutex<Option<StatusCode>>>,
}

async fn graphql_handler(
    State(state): State<CaptureState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let body: Value = serde_json::from_slice(&body).expect("request body should be json");
    state.reqs.lock().unwrap().push((headers, body));
    if let Some(status) = *state.status.lock().unwrap() {
        return (status, "upstream unavailable".to_string());
    }
    let payload = json!({
        "data": {
            "userProgressQuestionList": {
                "questions": [{
                    "frontendId": "1",
                    "title": "Two Sum",
                    "titleSlug": "two-sum",
                    "lastSubmittedAt": "2024-12-31T00:00:00+02:00",
                    "questionStatus": "SOLVED",
                    "lastResult": "AC"
                }]
            }
        }
    });
    (StatusCode::OK, payload.to_string())
}

async fn spawn_test_server(state: CaptureState) -> Url {
    let app = Router::new()
        .route("/graphql/", post(graphql_handler))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    Url::parse(&format!("http://{addr}/graphql/")).expect("valid endpoint url")
}

#[tokio::test]
async fn http_transport_sends_session_cookie_and_json_body() {
    let state = CaptureState::default();
    let endpoint = spawn_test_server(state.clone()).await;
    let transport = HttpTransport::new(endpoint, "jwt.session.cookie", Some("bearer-token".into())).unwrap();

    let client = LeetCodeClient::new(
        transport,
        QueryTemplates::default(),
        RetryPolicy {
            max_retries: 0,
            backoff: Duration::from_millis(1),
        },
    );
    let questions = client.fetch_questions().await.expect("fetch should succeed");
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].title_slug, "two-sum");

    let reqs = state.reqs.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    let (headers, body) = &reqs[0];
    assert_eq!(headers[header::COOKIE], "LEETCODE_SESSION=jwt.session.cookie");
    assert_eq!(headers[header::AUTHORIZATION], "Bearer bearer-token");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(headers.contains_key(header::REFERER));
    assert_eq!(body["operationName"], "userProgressQuestionList");
    assert!(body["query"].as_str().unwrap().contains("userProgressQuestionList"));
}

#[tokio::test]
async fn http_transport_reports_non_success_status_as_error() {
    let state = CaptureState::default();
    *state.status.lock().unwrap() = Some(StatusCode::BAD_GATEWAY);
    let endpoint = spawn_test_server(state.clone()).await;
    let transport = HttpTransport::new(endpoint, "jwt.session.cookie", None).unwrap();

    let err = transport
        .post(json!({ "operationName": "submissionDetails" }))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("502"), "unexpected message: {message}");
    assert!(message.contains("upstream unavailable"));
    let reqs = state.reqs.lock().unwrap();
    assert!(!reqs[0].0.contains_key(header::AUTHORIZATION));
}
