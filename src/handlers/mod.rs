use tracing::{debug, error, info};

use crate::{
    config::ChatConfig, error::ChatError, models::common::CompletionResult,
    services::CompletionBackend, utils::validate_prompt,
};

/// Validates the prompt, runs it through the backend and wraps the answer.
///
/// Nothing is sent upstream when validation fails.
pub async fn handle_prompt(
    backend: &dyn CompletionBackend,
    cfg: &ChatConfig,
    prompt: Option<&str>,
) -> Result<CompletionResult, ChatError> {
    let prompt = validate_prompt(prompt)?;
    debug!("Prompt received {}", prompt);

    match backend.complete(prompt, cfg).await {
        Ok(text) => {
            info!(backend = backend.name(), "Successfully completed chat response with: {}.", text);
            Ok(CompletionResult::ok(text))
        }
        Err(err) => {
            error!(backend = backend.name(), "Unexpected error occurred while completing the chat: {}", err);
            Err(err)
        }
    }
}
