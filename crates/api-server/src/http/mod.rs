use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use shared::llm::LlmGateway;
use shared::repos::ConversationStore;
use tower_http::cors::{Any, CorsLayer};

mod chat;
mod errors;
mod health;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub llm: Arc<dyn LlmGateway>,
}

pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::home))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/chat", post(chat::chat))
        .layer(cors)
        .with_state(app_state)
}
