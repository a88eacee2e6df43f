use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    ChatMessage, GroqGateway, GroqGatewayConfig, LlmGateway, LlmGatewayError, SYSTEM_PROMPT,
    assemble_prompt,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn sends_configured_model_and_bearer_key_and_parses_reply() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body(
            "provider-model",
            "Photosynthesis converts light into chemical energy.",
        ),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let response = gateway
        .generate(study_prompt())
        .await
        .expect("generate should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.model, "provider-model");
    assert_eq!(
        response.content,
        "Photosynthesis converts light into chemical energy."
    );
    let usage = response.usage.expect("usage should be reported");
    assert_eq!(usage.total_tokens, 20);

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1);
    assert_eq!(seen_bodies[0]["model"], "test-model");
    assert_eq!(seen_bodies[0]["messages"][0]["role"], "system");
    assert_eq!(seen_bodies[0]["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(
        seen_bodies[0]["messages"][1]["content"],
        "What is photosynthesis?"
    );

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-groq-key".to_string()]);
}

#[tokio::test]
async fn provider_error_status_fails_without_retry() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "error": { "code": "overloaded" } }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(study_prompt())
        .await
        .expect_err("provider errors should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::ProviderFailure(ref message) if message.contains("status=500")),
        "expected structured provider error, got {err:?}"
    );

    // One request on the wire: failures are not retried.
    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1);
}

#[tokio::test]
async fn auth_failure_surfaces_as_provider_failure() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::UNAUTHORIZED,
        body: json!({ "error": { "code": "invalid_api_key" } }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(study_prompt())
        .await
        .expect_err("auth errors should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::ProviderFailure(ref message) if message.contains("status=401")),
        "expected structured auth error, got {err:?}"
    );
}

#[tokio::test]
async fn unexpected_success_shape_is_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!("not a chat completion"),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(study_prompt())
        .await
        .expect_err("malformed payloads should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::InvalidProviderPayload(_)),
        "expected invalid payload error, got {err:?}"
    );
}

#[tokio::test]
async fn missing_choice_is_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({ "model": "provider-model", "choices": [] }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(study_prompt())
        .await
        .expect_err("empty choices should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::InvalidProviderPayload(ref detail) if detail.contains("missing_choice")),
        "expected missing choice error, got {err:?}"
    );
}

fn study_prompt() -> Vec<ChatMessage> {
    assemble_prompt(&[], "What is photosynthesis?")
}

fn config_for(chat_completions_url: String) -> GroqGatewayConfig {
    GroqGatewayConfig {
        chat_completions_url,
        api_key: "test-groq-key".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 5_000,
    }
}

fn success_response_body(model: &str, content: &str) -> Value {
    json!({
        "id": "req-success",
        "model": model,
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": content
                }
            }
        ],
        "usage": {
            "prompt_tokens": 12,
            "completion_tokens": 8,
            "total_tokens": 20
        }
    })
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/chat/completions", post(test_chat_completions_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/chat/completions"),
        shutdown_tx,
        server_task,
    )
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_bodies.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "error": { "code": "mock_exhausted" } }),
    });

    (reply.status, Json(reply.body))
}
