use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::{AppState, error::ChatError, handlers, models::common::ApiResponse};

type Rejection = (StatusCode, Json<ApiResponse>);

#[utoipa::path(
    post,
    path = "/chat/completions",
    tag = "chat",
    request_body(
        content = String,
        description = "The prompt, as a JSON string.",
        content_type = "application/json",
        example = json!("What is Azure Front Door?")
    ),
    responses(
        (status = 200, description = "Completion text", body = ApiResponse,
            example = json!({ "success": true, "data": "Azure Front Door is ..." })),
        (status = 400, description = "Missing, empty or non-string prompt", body = ApiResponse,
            example = json!({ "success": false, "error": "Prompt cannot be null, empty, or whitespace." })),
        (status = 503, description = "Chat service failed or timed out", body = ApiResponse,
            example = json!({ "success": false, "error": "Service is temporarily unavailable." }))
    )
)]
pub async fn completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse>, Rejection> {
    let prompt = parse_prompt(&body).map_err(reject)?;

    // One snapshot per request; a reload mid-request does not affect it.
    let cfg = state.config.snapshot().await;
    info!(backend = state.backend.name(), "Incoming completion request");

    let result = handlers::handle_prompt(state.backend.as_ref(), &cfg, prompt.as_deref())
        .await
        .map_err(reject)?;

    Ok(Json(result.into()))
}

/// Body is a JSON string. An empty body or `null` means no prompt.
fn parse_prompt(body: &[u8]) -> Result<Option<String>, ChatError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: JsonValue = serde_json::from_slice(body)
        .map_err(|err| ChatError::InvalidArgument(format!("Request body is not valid JSON: {err}")))?;
    match value {
        JsonValue::String(s) => Ok(Some(s)),
        JsonValue::Null => Ok(None),
        _ => Err(ChatError::InvalidArgument(
            "Request body must be a JSON string.".to_string(),
        )),
    }
}

fn reject(err: ChatError) -> Rejection {
    (err.status_code(), Json(ApiResponse::failure(err.public_message())))
}
