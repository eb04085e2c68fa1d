//! OpenAI-compatible client against an in-process HTTP server

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use doc_translator_core::{ChatClient, ChatRequest, Error, LlmConfig, OpenAiChatClient};
use serde_json::{Value, json};

/// How the fake server answers each request, by attempt number (0-based).
#[derive(Clone, Copy)]
enum Script {
    /// 503 on the first attempt, then success
    FlakyThenOk,
    AlwaysUnauthorized,
    /// 429 with `Retry-After: 0`, then success
    RateLimitedThenOk,
    /// Sleep longer than the client timeout
    Hang,
    /// Succeed only when the bearer token matches
    RequireKey,
    BadRequest,
}

#[derive(Clone)]
struct ServerState {
    script: Script,
    hits: Arc<AtomicUsize>,
}

fn completion(content: &str) -> Response {
    Json(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn chat_completions(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let attempt = state.hits.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body["messages"][0]["role"], "system");

    match state.script {
        Script::FlakyThenOk if attempt == 0 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Script::RateLimitedThenOk if attempt == 0 => {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")]).into_response()
        }
        Script::AlwaysUnauthorized => StatusCode::UNAUTHORIZED.into_response(),
        Script::BadRequest => (StatusCode::BAD_REQUEST, "bad model").into_response(),
        Script::Hang => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            completion("too late")
        }
        Script::RequireKey => {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth == "Bearer sk-test" {
                completion("authorized")
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }
        _ => completion("Bonjour"),
    }
}

/// Start a server and return its base URL and hit counter.
async fn serve(script: Script) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(ServerState {
            script,
            hits: hits.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1"), hits)
}

fn client(api_base: &str) -> OpenAiChatClient {
    let config = LlmConfig {
        request_timeout_secs: 1,
        max_retries: 2,
        retry_delay_ms: 10,
        ..LlmConfig::new(api_base, Some("sk-test".to_string()), "gpt-test")
    };
    OpenAiChatClient::new(&config).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-test".to_string(),
        system: "You are a translator.".to_string(),
        user: "Hello".to_string(),
        temperature: 0.2,
        max_tokens: 50,
    }
}

#[tokio::test]
async fn test_retries_transient_server_error() {
    let (base, hits) = serve(Script::FlakyThenOk).await;
    let answer = client(&base).complete(&request()).await.unwrap();
    assert_eq!(answer, "Bonjour");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retries_rate_limit() {
    let (base, hits) = serve(Script::RateLimitedThenOk).await;
    let answer = client(&base).complete(&request()).await.unwrap();
    assert_eq!(answer, "Bonjour");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_retry_on_unauthorized() {
    let (base, hits) = serve(Script::AlwaysUnauthorized).await;
    let err = client(&base).complete(&request()).await.unwrap_err();
    assert!(matches!(err, Error::ApiUnauthorized { status: 401 }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_retry_on_bad_request() {
    let (base, hits) = serve(Script::BadRequest).await;
    let err = client(&base).complete(&request()).await.unwrap_err();
    match err {
        Error::ApiStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad model");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let (base, _) = serve(Script::Hang).await;
    let config = LlmConfig {
        request_timeout_secs: 1,
        max_retries: 0,
        ..LlmConfig::new(&base, Some("sk-test".to_string()), "gpt-test")
    };
    let err = OpenAiChatClient::new(&config)
        .unwrap()
        .complete(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ApiTimeout(_)));
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let (base, _) = serve(Script::RequireKey).await;
    let answer = client(&base).complete(&request()).await.unwrap();
    assert_eq!(answer, "authorized");
}
