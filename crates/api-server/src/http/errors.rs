use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::LlmGatewayError;
use shared::models::{ErrorBody, ErrorResponse};
use shared::repos::StoreError;
use tracing::{error, warn};

pub(super) fn bad_gateway_response(code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    error!("database operation failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: ErrorBody {
                code: "internal_error".to_string(),
                message: "Unexpected server error".to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn llm_error_response(err: LlmGatewayError) -> Response {
    warn!("llm generation failed: {err}");
    match err {
        LlmGatewayError::Timeout => bad_gateway_response("llm_timeout", "Model provider timed out"),
        LlmGatewayError::ProviderFailure(_) => {
            bad_gateway_response("llm_unavailable", "Model provider request failed")
        }
        LlmGatewayError::InvalidProviderPayload(_) => bad_gateway_response(
            "llm_invalid_response",
            "Model provider returned an invalid response",
        ),
    }
}
