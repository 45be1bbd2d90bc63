use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chat_relay_sdk::{
    openai::{OpenAIChatProvider, OpenAIChatProviderOptions},
    ChatMessage, ChatProvider, ProviderError, StreamDelta,
};
use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::test;

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

/// Serves `body` as the SSE response of `/chat/completions` and records the
/// request it receives.
async fn spawn_vendor(status: StatusCode, body: String) -> (String, Captured) {
    let captured = Captured::default();
    let handler_captured = captured.clone();

    let app = Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(request): Json<Value>| {
            let captured = handler_captured.clone();
            let body = body.clone();
            async move {
                *captured.body.lock().unwrap() = Some(request);
                *captured.authorization.lock().unwrap() = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                (status, [(header::CONTENT_TYPE, "text/event-stream")], body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

fn sse(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|payload| format!("data: {payload}\n\n"))
        .collect()
}

fn content_chunk(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "model": "test-model",
        "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }]
    })
    .to_string()
}

fn provider(base_url: String) -> OpenAIChatProvider {
    OpenAIChatProvider::new(
        "test-model",
        OpenAIChatProviderOptions {
            base_url: Some(base_url),
            api_key: "sk-test".to_string(),
            ..Default::default()
        },
    )
}

async fn collect(provider: &OpenAIChatProvider) -> Vec<Result<StreamDelta, ProviderError>> {
    provider
        .stream(vec![ChatMessage::user("hello")])
        .await
        .unwrap()
        .collect()
        .await
}

#[test]
async fn streams_text_deltas_and_end_marker() {
    let role_only = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#;
    let finish = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
    let body = sse(&[
        role_only,
        &content_chunk("Hel"),
        &content_chunk("lo"),
        finish,
        "[DONE]",
    ]);
    let (base_url, captured) = spawn_vendor(StatusCode::OK, body).await;

    let items = collect(&provider(base_url)).await;
    let deltas = items
        .into_iter()
        .map(Result::unwrap)
        .collect::<Vec<_>>();

    assert_eq!(deltas, vec![
        StreamDelta::Text("Hel".to_string()),
        StreamDelta::Text("lo".to_string()),
        StreamDelta::End,
    ]);

    let request = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(request["model"], "test-model");
    assert_eq!(request["stream"], true);
    assert_eq!(request["messages"][0]["role"], "user");
    assert_eq!(request["messages"][0]["content"], "hello");
    assert_eq!(
        captured.authorization.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );
}

#[test]
async fn body_closing_without_done_sentinel_still_ends() {
    let body = sse(&[&content_chunk("only")]);
    let (base_url, _) = spawn_vendor(StatusCode::OK, body).await;

    let items = collect(&provider(base_url)).await;
    let deltas = items
        .into_iter()
        .map(Result::unwrap)
        .collect::<Vec<_>>();

    assert_eq!(deltas, vec![
        StreamDelta::Text("only".to_string()),
        StreamDelta::End
    ]);
}

#[test]
async fn rejected_request_fails_before_streaming() {
    let (base_url, _) = spawn_vendor(
        StatusCode::UNAUTHORIZED,
        r#"{"error":{"message":"bad key"}}"#.to_string(),
    )
    .await;

    let result = provider(base_url)
        .stream(vec![ChatMessage::user("hello")])
        .await;

    match result {
        Err(ProviderError::StatusCode(status, body)) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("bad key"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected the request to be rejected"),
    }
}

#[test]
async fn unrecognized_chunk_fails_closed() {
    let body = sse(&[&content_chunk("fine"), r#"{"unexpected":"shape"}"#]);
    let (base_url, _) = spawn_vendor(StatusCode::OK, body).await;

    let items = collect(&provider(base_url)).await;

    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0], Ok(StreamDelta::Text(text)) if text == "fine"));
    assert!(matches!(
        &items[1],
        Err(ProviderError::Normalization("openai", _))
    ));
}

#[test]
async fn error_payload_ends_stream_with_upstream_error() {
    let body = sse(&[
        &content_chunk("a"),
        r#"{"error":{"message":"overloaded","type":"server_error"}}"#,
    ]);
    let (base_url, _) = spawn_vendor(StatusCode::OK, body).await;

    let items = collect(&provider(base_url)).await;

    assert_eq!(items.len(), 2);
    assert!(matches!(
        &items[1],
        Err(ProviderError::Upstream(_, message)) if message == "overloaded"
    ));
}

#[test]
async fn groq_style_provider_sends_temperature() {
    let body = sse(&[&content_chunk("hi"), "[DONE]"]);
    let (base_url, captured) = spawn_vendor(StatusCode::OK, body).await;

    let groq = OpenAIChatProvider::new(
        "mixtral-8x7b-32768",
        OpenAIChatProviderOptions {
            provider: Some("groq"),
            base_url: Some(format!("{base_url}/")),
            api_key: "gsk-test".to_string(),
            temperature: Some(0.7),
            ..Default::default()
        },
    );
    assert_eq!(groq.provider(), "groq");

    let items = collect(&groq).await;
    assert_eq!(items.len(), 2);

    let request = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(request["temperature"], 0.7);
    assert_eq!(request["model"], "mixtral-8x7b-32768");
}

#[test]
async fn empty_conversation_is_invalid_input() {
    let result = provider("http://127.0.0.1:9".to_string()).stream(Vec::new()).await;
    assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
}
