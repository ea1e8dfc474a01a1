use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use bedrock_relay::{
    AdmissionQueue, AppState, HttpDispatcher, MistralBedrockTranslator, Pipeline, SigV4Credentials,
    SigV4Signer, router, test_support,
};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn app(endpoint: &str, capacity: usize, queue_wait: Duration) -> Router {
    let signer = SigV4Signer::new(
        SigV4Credentials {
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        },
        "us-east-1",
        "bedrock",
    )
    .unwrap();
    let pipeline = Pipeline::new(
        MistralBedrockTranslator::CAPABILITY,
        MistralBedrockTranslator::new("us-east-1").with_endpoint(endpoint),
        signer,
        AdmissionQueue::new(capacity, queue_wait),
        Arc::new(HttpDispatcher::new().unwrap()),
    )
    .unwrap();
    router(AppState::new(pipeline))
}

fn chat_request(model: &str) -> Request<Body> {
    let payload = json!({
        "model": model,
        "messages": [{"role": "user", "content": "hello"}]
    });
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap();
    (status, parsed)
}

#[tokio::test]
async fn end_to_end_signed_dispatch_echoes_the_requested_model() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .json_body_includes(r#"{"model": "mistral.mistral-small-2402-v1:0"}"#)
                .header_exists("authorization")
                .header_exists("x-amz-date")
                .header_exists("x-amz-content-sha256");
            // Bedrock does not always confirm the model in the response.
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi"}}],
                "usage": {"total_tokens": 7}
            }));
        })
        .await;

    let app = app(&server.base_url(), 2, Duration::from_secs(5));
    let response = app
        .oneshot(chat_request("mistral-small-latest"))
        .await
        .unwrap();
    let (status, body) = response_json(response).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], json!("mistral-small-latest"));
    assert_eq!(body["usage"]["total_tokens"], json!(7));
}

#[tokio::test]
async fn outbound_body_carries_the_resolved_bedrock_id() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .json_body_includes(r#"{"model": "mistral.mistral-large-2402-v1:0"}"#);
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;

    let app = app(&server.base_url(), 2, Duration::from_secs(5));
    let response = app
        .oneshot(chat_request("mistral-large-2402"))
        .await
        .unwrap();
    let (status, _) = response_json(response).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unsupported_model_is_rejected_without_touching_the_backend() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({}));
        })
        .await;

    let app = app(&server.base_url(), 2, Duration::from_secs(5));
    let response = app.oneshot(chat_request("gpt-4o")).await.unwrap();
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("unsupported_model"));
    assert_eq!(body["error"]["type"], json!("invalid_request_error"));
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("gpt-4o"));
    assert!(message.contains("mistral.mistral-small-2402-v1:0"));
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn backend_failure_status_is_forwarded_in_the_envelope() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500)
                .json_body(json!({"message": "model unavailable"}));
        })
        .await;

    let app = app(&server.base_url(), 2, Duration::from_secs(5));
    let response = app
        .oneshot(chat_request("mistral-small-latest"))
        .await
        .unwrap();
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("upstream_error"));
}

#[tokio::test]
async fn non_json_backend_body_is_a_bad_upstream_response() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body("<html>gateway error</html>");
        })
        .await;

    let app = app(&server.base_url(), 2, Duration::from_secs(5));
    let response = app
        .oneshot(chat_request("mistral-small-latest"))
        .await
        .unwrap();
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], json!("bad_upstream_response"));
}

#[tokio::test]
async fn saturated_queue_surfaces_backpressure_distinctly() {
    if test_support::should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"choices": []}))
                .delay(Duration::from_millis(500));
        })
        .await;

    // One slot, short queue wait: of two concurrent requests, one must be
    // admitted and one must time out in admission.
    let app = app(&server.base_url(), 1, Duration::from_millis(50));
    let (first, second) = tokio::join!(
        app.clone().oneshot(chat_request("mistral-small-latest")),
        app.clone().oneshot(chat_request("mistral-small-latest")),
    );
    let (first_status, first_body) = response_json(first.unwrap()).await;
    let (second_status, second_body) = response_json(second.unwrap()).await;

    let mut outcomes = [(first_status, first_body), (second_status, second_body)];
    outcomes.sort_by_key(|(status, _)| status.as_u16());

    assert_eq!(outcomes[0].0, StatusCode::OK);
    assert_eq!(outcomes[1].0, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(outcomes[1].1["error"]["type"], json!("overloaded_error"));
    assert_eq!(outcomes[1].1["error"]["code"], json!("queue_timeout"));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = app("http://127.0.0.1:1", 1, Duration::from_secs(1));
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let (status, body) = response_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
