//! Replicate provider integration tests
//!
//! Runs `ReplicateProvider` and `Session` against a `wiremock` server that
//! plays both halves of the Replicate exchange: the prediction-creation POST
//! and the Server-Sent Events stream it points to.
//!
//! SSE responses use `set_body_raw(bytes, "text/event-stream")` so the
//! content type is exactly what Replicate sends.

mod common;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lipi::config::{GenerationConfig, ReplicateConfig};
use lipi::providers::{GenerationRequest, Provider, ReplicateProvider};
use lipi::{ApiToken, LipiError, Session};

const PREDICTIONS_PATH: &str = "/v1/models/meta/meta-llama-3-8b-instruct/predictions";
const STREAM_PATH: &str = "/stream/pred-123";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_provider(server: &MockServer) -> ReplicateProvider {
    ReplicateProvider::new(ReplicateConfig {
        api_base: format!("{}/v1", server.uri()),
        ..Default::default()
    })
    .expect("provider")
}

fn token() -> ApiToken {
    ApiToken::parse(common::valid_token()).expect("valid token")
}

fn prediction_body(server: &MockServer) -> serde_json::Value {
    json!({
        "id": "pred-123",
        "model": "meta/meta-llama-3-8b-instruct",
        "status": "starting",
        "urls": {
            "get": format!("{}/v1/predictions/pred-123", server.uri()),
            "cancel": format!("{}/v1/predictions/pred-123/cancel", server.uri()),
            "stream": format!("{}{}", server.uri(), STREAM_PATH),
        },
        "error": null
    })
}

async fn mount_prediction(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(prediction_body(server)))
        .mount(server)
        .await;
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .and(header("accept", "text/event-stream"))
        .and(header("cache-control", "no-store"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream"),
        )
        .mount(server)
        .await;
}

async fn collect(provider: &ReplicateProvider) -> Vec<anyhow::Result<String>> {
    let request = GenerationRequest::new("mero naam Assistant: ", &GenerationConfig::default());
    provider
        .stream_generation(&request, &token())
        .await
        .expect("stream should start")
        .collect()
        .await
}

// ---------------------------------------------------------------------------
// Prediction creation
// ---------------------------------------------------------------------------

/// The POST carries the bearer token, `stream: true` and every model input.
#[tokio::test]
async fn test_prediction_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .and(header(
            "authorization",
            format!("Bearer {}", common::valid_token()).as_str(),
        ))
        .and(body_partial_json(json!({
            "stream": true,
            "input": {
                "prompt": "mero naam Assistant: ",
                "temperature": 0.1,
                "top_p": 0.9,
                "max_length": 120,
                "repetition_penalty": 1.0
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(prediction_body(&server)))
        .expect(1)
        .mount(&server)
        .await;
    mount_stream(&server, common::sse_body(&["मेरो"])).await;

    let provider = make_provider(&server);
    let items = collect(&provider).await;
    assert_eq!(items.len(), 1);
}

/// 401 from Replicate maps to an authentication error and no stream.
#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})),
        )
        .mount(&server)
        .await;

    let provider = make_provider(&server);
    let request = GenerationRequest::new("p", &GenerationConfig::default());
    let err = match provider.stream_generation(&request, &token()).await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };

    assert!(matches!(
        err.downcast_ref::<LipiError>(),
        Some(LipiError::Authentication(_))
    ));
    assert!(err.to_string().contains("Invalid token."));
}

/// Other non-success statuses are provider errors.
#[tokio::test]
async fn test_server_error_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad input"))
        .mount(&server)
        .await;

    let provider = make_provider(&server);
    let request = GenerationRequest::new("p", &GenerationConfig::default());
    let err = match provider.stream_generation(&request, &token()).await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };

    assert!(matches!(
        err.downcast_ref::<LipiError>(),
        Some(LipiError::Provider(_))
    ));
}

/// A prediction body that is not JSON is a serialization error.
#[tokio::test]
async fn test_malformed_prediction_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let provider = make_provider(&server);
    let request = GenerationRequest::new("p", &GenerationConfig::default());
    let err = match provider.stream_generation(&request, &token()).await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };

    assert!(matches!(
        err.downcast_ref::<LipiError>(),
        Some(LipiError::Serialization(_))
    ));
}

/// A prediction without a stream URL cannot be streamed.
#[tokio::test]
async fn test_missing_stream_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICTIONS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "pred-123",
            "status": "starting",
            "urls": {"get": "http://example.invalid/get"}
        })))
        .mount(&server)
        .await;

    let provider = make_provider(&server);
    let request = GenerationRequest::new("p", &GenerationConfig::default());
    let err = match provider.stream_generation(&request, &token()).await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };

    assert!(matches!(
        err.downcast_ref::<LipiError>(),
        Some(LipiError::StreamingNotSupported)
    ));
}

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

/// Output events arrive in order with leading spaces intact; `done` ends it.
#[tokio::test]
async fn test_output_events_stream_in_order() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    mount_stream(&server, common::sse_body(&["म", "लाई", " थाहा छ"])).await;

    let provider = make_provider(&server);
    let fragments: Vec<String> = collect(&provider)
        .await
        .into_iter()
        .map(|item| item.expect("fragment"))
        .collect();

    assert_eq!(fragments, vec!["म", "लाई", " थाहा छ"]);
}

/// Events after `done` are never delivered.
#[tokio::test]
async fn test_done_ends_stream() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    let body = "event: output\ndata: a\n\nevent: done\ndata: {}\n\nevent: output\ndata: late\n\n";
    mount_stream(&server, body.to_string()).await;

    let provider = make_provider(&server);
    let items = collect(&provider).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), "a");
}

/// An `error` event becomes the final, failing item.
#[tokio::test]
async fn test_error_event_fails_stream() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    let body = concat!(
        "event: output\ndata: म\n\n",
        "event: error\ndata: {\"detail\":\"CUDA out of memory\"}\n\n",
        "event: output\ndata: never\n\n",
    );
    mount_stream(&server, body.to_string()).await;

    let provider = make_provider(&server);
    let items = collect(&provider).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "म");
    let err = items[1].as_ref().unwrap_err();
    assert!(err.to_string().contains("CUDA out of memory"));
}

/// Keep-alive comments and unrelated events are skipped.
#[tokio::test]
async fn test_comments_and_logs_ignored() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    let body = concat!(
        ": ping\n\n",
        "event: logs\ndata: loading weights\n\n",
        "event: output\ndata: नमस्ते\n\n",
        "event: done\ndata: {}\n\n",
    );
    mount_stream(&server, body.to_string()).await;

    let provider = make_provider(&server);
    let items = collect(&provider).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), "नमस्ते");
}

// ---------------------------------------------------------------------------
// Session end to end
// ---------------------------------------------------------------------------

/// A full chat step commits the streamed reply after the user turn.
#[tokio::test]
async fn test_session_commits_streamed_reply() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    mount_stream(&server, common::sse_body(&["म", "लाई", " थाहा छ"])).await;

    let provider = make_provider(&server);
    let mut session = Session::new(GenerationConfig::default(), Some(token()));
    let mut displayed = Vec::new();

    let content = session
        .ask(&provider, "malai thaha chha", |text| {
            displayed.push(text.to_string())
        })
        .await
        .expect("ask")
        .content()
        .to_string();

    assert_eq!(content, "मलाई थाहा छ");
    assert_eq!(displayed, vec!["म", "मलाई", "मलाई थाहा छ"]);
    assert_eq!(session.transcript().len(), 3);
}

/// A remote error leaves the transcript ending with the user turn.
#[tokio::test]
async fn test_session_error_event_commits_nothing() {
    let server = MockServer::start().await;
    mount_prediction(&server).await;
    mount_stream(
        &server,
        "event: output\ndata: म\n\nevent: error\ndata: boom\n\n".to_string(),
    )
    .await;

    let provider = make_provider(&server);
    let mut session = Session::new(GenerationConfig::default(), Some(token()));

    let failed = session.ask(&provider, "malai", |_| {}).await.is_err();

    assert!(failed);
    assert_eq!(session.transcript().len(), 2);
    assert!(session.transcript().response_owed());
}
