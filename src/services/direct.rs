use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::services::{CompletionBackend, read_body};

/// One POST of `{input_name: prompt}` to the configured endpoint, answer read
/// from `output_name` in the JSON reply.
#[derive(Clone)]
pub struct DirectBackend {
    http: reqwest::Client,
}

impl DirectBackend {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CompletionBackend for DirectBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn complete(&self, prompt: &str, cfg: &ChatConfig) -> Result<String, ChatError> {
        let mut payload = Map::new();
        payload.insert(cfg.input_name.clone(), Value::String(prompt.to_string()));

        let res = self
            .http
            .post(cfg.endpoint_url.clone())
            .bearer_auth(&cfg.api_key)
            .json(&payload)
            .send()
            .await?;

        let body = read_body(res).await?;
        debug!("Result: {}", body);

        extract_output(&body, &cfg.output_name)
    }
}

/// Pulls `field` out of a JSON object body. A missing or null field is "".
fn extract_output(body: &str, field: &str) -> Result<String, ChatError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("invalid JSON: {e}")))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| ChatError::MalformedResponse("expected a JSON object".to_string()))?;

    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        Some(_) => Err(ChatError::MalformedResponse(format!(
            "field '{field}' is not a scalar"
        ))),
    }
}
