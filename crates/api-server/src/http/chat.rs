use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use shared::llm::assemble_prompt;
use shared::models::{ChatRequest, ChatResponse, TurnRole};
use shared::repos::NewChatTurn;
use tracing::debug;

use super::AppState;
use super::errors::{llm_error_response, store_error_response};

pub(super) async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let asked_at = Utc::now();

    let history = match state.store.history(req.user_id.clone()).await {
        Ok(history) => history,
        Err(err) => return store_error_response(err),
    };

    let prompt = assemble_prompt(&history, &req.question);

    let generated = match state.llm.generate(prompt).await {
        Ok(generated) => generated,
        Err(err) => return llm_error_response(err),
    };

    debug!(
        model = %generated.model,
        total_tokens = generated.usage.as_ref().map(|usage| usage.total_tokens),
        "chat completion generated"
    );

    let question = NewChatTurn {
        user_id: req.user_id.clone(),
        role: TurnRole::Human,
        message: req.question,
        timestamp: asked_at,
    };
    let answer = NewChatTurn {
        user_id: req.user_id,
        role: TurnRole::Ai,
        message: generated.content.clone(),
        timestamp: Utc::now(),
    };

    if let Err(err) = state.store.append_exchange(question, answer).await {
        return store_error_response(err);
    }

    (
        StatusCode::OK,
        Json(ChatResponse {
            response: generated.content,
        }),
    )
        .into_response()
}
