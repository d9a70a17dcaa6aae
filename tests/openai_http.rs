/// HTTP-level tests for the chat completions client against a local mock server.
///
/// The client is blocking, so every call runs on tokio's blocking pool while
/// the mock server keeps serving.
use std::sync::Arc;
use std::time::Duration;

use autotag::autotagger::{SUGGEST_FUNCTION_NAME, TagSuggesterBuilder, build_request};
use autotag::openai::{OpenAiClientBuilder, OpenAiClientTrait, OpenAiError};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn function_call_body(arguments: Value) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "function_call": {
                    "name": SUGGEST_FUNCTION_NAME,
                    "arguments": arguments.to_string()
                }
            },
            "finish_reason": "stop"
        }]
    })
}

async fn suggest_against(
    server: &MockServer,
    text: &'static str,
    max_tags: usize,
) -> Result<Vec<String>, OpenAiError> {
    let base_url = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = OpenAiClientBuilder::new()
            .base_url(base_url)
            .build()
            .expect("client should build");
        let suggester = TagSuggesterBuilder::new(Arc::new(client))
            .max_tags(max_tags)
            .build();
        suggester.suggest(text, "sk-test", "gpt-4", 0.2)
    })
    .await
    .expect("blocking task panicked")
}

#[tokio::test]
async fn request_is_authenticated_and_schema_constrained() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(function_call_body(json!({"tags": ["rust", "web dev"]}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tags = suggest_against(&server, "Notes about axum routing", 4)
        .await
        .unwrap();
    assert_eq!(tags, vec!["rust", "web dev"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();

    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["max_tokens"], 2048);
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(body["function_call"]["name"], SUGGEST_FUNCTION_NAME);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(
        messages[1]["content"],
        "--start--\nNotes about axum routing\n--end--"
    );

    let function = &body["functions"][0];
    assert_eq!(function["name"], SUGGEST_FUNCTION_NAME);
    let tags_schema = &function["parameters"]["properties"]["tags"];
    assert_eq!(tags_schema["type"], "array");
    assert_eq!(tags_schema["minItems"], 1);
    assert_eq!(tags_schema["maxItems"], 4);
    assert_eq!(function["parameters"]["required"], json!(["tags"]));
}

#[tokio::test]
async fn upstream_error_envelope_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "Rate limit reached",
                "type": "requests",
                "code": "rate_limit_exceeded"
            }
        })))
        .mount(&server)
        .await;

    let err = suggest_against(&server, "text", 3).await.unwrap_err();
    match err {
        OpenAiError::Upstream { code, message } => {
            assert_eq!(code, "rate_limit_exceeded");
            assert_eq!(message, "Rate limit reached");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_without_function_call_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-456",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "rust, web"},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let err = suggest_against(&server, "text", 3).await.unwrap_err();
    assert!(matches!(err, OpenAiError::MalformedResponse(_)));
    assert!(err.to_string().contains("no function call"));
}

#[tokio::test]
async fn error_status_without_envelope_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = suggest_against(&server, "text", 3).await.unwrap_err();
    assert!(err.is_transport());
    match err {
        OpenAiError::Http { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_yields_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(function_call_body(json!({"tags": ["late"]})))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let base_url = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let client = OpenAiClientBuilder::new()
            .base_url(base_url)
            .timeout(Duration::from_millis(50))
            .build()
            .expect("client should build");
        client.chat_completion("sk-test", &build_request("text", "gpt-4", 0.5, 3))
    })
    .await
    .expect("blocking task panicked")
    .unwrap_err();

    assert!(matches!(err, OpenAiError::Timeout(_)), "got {err:?}");
    assert!(err.is_transport());
    assert_eq!(err.to_string(), "Request timed out");
}

#[tokio::test]
async fn blank_text_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = suggest_against(&server, "   \n ", 3).await.unwrap_err();
    assert!(matches!(err, OpenAiError::InvalidInput(_)));
}
