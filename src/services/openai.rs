use async_trait::async_trait;
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::ai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::services::{CompletionBackend, api_url, read_body};

/// OpenAI-compatible `/chat/completions`, one system and one user message.
#[derive(Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, cfg: &ChatConfig) -> Result<String, ChatError> {
        let request = ChatCompletionRequest {
            model: &cfg.deployment,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &cfg.system_prompt,
                    name: Some(cfg.output_name.as_str()),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                    name: Some(cfg.input_name.as_str()),
                },
            ],
        };

        let res = self
            .http
            .post(api_url(cfg, &["chat", "completions"]))
            .bearer_auth(&cfg.api_key)
            .json(&request)
            .send()
            .await?;

        let body = read_body(res).await?;
        debug!("Result: {}", body);

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
        Ok(parsed.first_text())
    }
}
