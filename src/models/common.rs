// src/models/common.rs
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Normalized outcome of one completion, whichever backend produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub success: bool,
    pub text: String,
}

impl CompletionResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }
}

/// Envelope returned by every chat route, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    /// Completion text. Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Caller-safe error description. Present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl From<CompletionResult> for ApiResponse {
    fn from(result: CompletionResult) -> Self {
        Self {
            success: result.success,
            data: Some(result.text),
            error: None,
        }
    }
}
