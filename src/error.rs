use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::models::agents::RunStatus;

/// Generic message returned to callers for every non-validation failure.
pub const UNAVAILABLE_MESSAGE: &str = "Service is temporarily unavailable.";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad or missing prompt. Raised before any outbound call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Remote service answered with a non-2xx status.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// 2xx answer whose body could not be understood.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// A setting the active backend needs is absent from the current snapshot.
    #[error("missing configuration: {0}")]
    Misconfigured(&'static str),

    /// Network-level failure (connect, TLS, read).
    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Run did not reach a terminal status before the deadline, or the wait was cancelled.
    #[error("gave up waiting for run after {0:?}")]
    Timeout(Duration),

    /// Run reached a terminal status other than completed.
    #[error("run ended with status {status}{}", reason_suffix(.reason))]
    RunFailed {
        status: RunStatus,
        reason: Option<String>,
    },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Text safe to show the caller. Only validation errors echo their detail.
    pub fn public_message(&self) -> String {
        match self {
            ChatError::InvalidArgument(msg) => msg.clone(),
            _ => UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}
