use crate::error::ChatError;

pub const EMPTY_PROMPT_MESSAGE: &str = "Prompt cannot be null, empty, or whitespace.";

/// Rejects absent, empty and whitespace-only prompts. The prompt is passed on unmodified.
pub fn validate_prompt(prompt: Option<&str>) -> Result<&str, ChatError> {
    match prompt {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err(ChatError::InvalidArgument(EMPTY_PROMPT_MESSAGE.to_string())),
    }
}
