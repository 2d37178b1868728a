use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::agents::{
    CreateMessageRequest, CreateRunRequest, MessageList, Role, Run, RunStatus, Thread,
    ThreadMessage, assistant_text,
};
use crate::services::{CompletionBackend, api_url, read_body};

/// Agents API workflow: new thread, user message, run, poll, read replies.
///
/// A fresh thread is created for every prompt; nothing is reused between
/// requests. Polling is bounded by `poll_timeout` and aborted when the
/// shutdown token fires.
#[derive(Clone)]
pub struct ThreadBackend {
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl ThreadBackend {
    pub fn new(http: reqwest::Client, shutdown: CancellationToken) -> Self {
        Self { http, shutdown }
    }

    async fn post_json<B, R>(&self, cfg: &ChatConfig, segments: &[&str], body: &B) -> Result<R, ChatError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let res = self
            .http
            .post(api_url(cfg, segments))
            .bearer_auth(&cfg.api_key)
            .json(body)
            .send()
            .await?;
        parse(read_body(res).await?)
    }

    async fn get_json<R>(&self, cfg: &ChatConfig, segments: &[&str], query: &[(&str, &str)]) -> Result<R, ChatError>
    where
        R: DeserializeOwned,
    {
        let res = self
            .http
            .get(api_url(cfg, segments))
            .bearer_auth(&cfg.api_key)
            .query(query)
            .send()
            .await?;
        parse(read_body(res).await?)
    }

    /// Re-fetches the run until it leaves the pending statuses.
    async fn wait_for_run(&self, cfg: &ChatConfig, thread_id: &str, run: Run) -> Result<Run, ChatError> {
        let started = Instant::now();
        let run_id = run.id.clone();

        let poll = {
            let run_id = run_id.as_str();
            async move {
                let mut run = run;
                while run.status.is_pending() {
                    tokio::time::sleep(cfg.poll_interval).await;
                    run = self
                        .get_json(cfg, &["threads", thread_id, "runs", run_id], &[])
                        .await?;
                    debug!(run_id = %run.id, status = %run.status, "Polled run");
                }
                Ok(run)
            }
        };

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err(ChatError::Timeout(started.elapsed())),
            res = tokio::time::timeout(cfg.poll_timeout, poll) => {
                res.unwrap_or(Err(ChatError::Timeout(cfg.poll_timeout)))
            }
        };

        if matches!(outcome, Err(ChatError::Timeout(_))) {
            self.cancel_run(cfg, thread_id, &run_id).await;
        }
        outcome
    }

    /// Best effort. The run is abandoned either way.
    async fn cancel_run(&self, cfg: &ChatConfig, thread_id: &str, run_id: &str) {
        let res = self
            .post_json::<_, IgnoredAny>(cfg, &["threads", thread_id, "runs", run_id, "cancel"], &json!({}))
            .await;
        if let Err(err) = res {
            warn!(run_id, "Failed to cancel abandoned run: {}", err);
        }
    }

    /// All messages on the thread in ascending creation order, across pages.
    async fn list_messages(&self, cfg: &ChatConfig, thread_id: &str) -> Result<Vec<ThreadMessage>, ChatError> {
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![("order", "asc")];
            if let Some(cursor) = after.as_deref() {
                query.push(("after", cursor));
            }
            let page: MessageList = self
                .get_json(cfg, &["threads", thread_id, "messages"], &query)
                .await?;

            let next = page
                .last_id
                .clone()
                .or_else(|| page.data.last().map(|m| m.id.clone()));
            let has_more = page.has_more && !page.data.is_empty();
            messages.extend(page.data);

            match next {
                Some(id) if has_more && after.as_deref() != Some(id.as_str()) => after = Some(id),
                _ => break,
            }
        }
        Ok(messages)
    }
}

#[async_trait]
impl CompletionBackend for ThreadBackend {
    fn name(&self) -> &'static str {
        "thread"
    }

    async fn complete(&self, prompt: &str, cfg: &ChatConfig) -> Result<String, ChatError> {
        let agent_id = cfg
            .agent_id
            .as_deref()
            .ok_or(ChatError::Misconfigured("CHAT_AGENT_ID"))?;

        let thread: Thread = self.post_json(cfg, &["threads"], &json!({})).await?;
        debug!(thread_id = %thread.id, "Created thread");

        let _: IgnoredAny = self
            .post_json(
                cfg,
                &["threads", thread.id.as_str(), "messages"],
                &CreateMessageRequest {
                    role: Role::User,
                    content: prompt,
                },
            )
            .await?;

        let run: Run = self
            .post_json(
                cfg,
                &["threads", thread.id.as_str(), "runs"],
                &CreateRunRequest {
                    assistant_id: agent_id,
                },
            )
            .await?;
        debug!(run_id = %run.id, status = %run.status, "Started run");

        let run = self.wait_for_run(cfg, &thread.id, run).await?;
        info!(thread_id = %thread.id, run_id = %run.id, "Run finished with status {}", run.status);

        if run.status != RunStatus::Completed {
            let reason = run.last_error.and_then(|e| match (e.code, e.message) {
                (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                (code, message) => message.or(code),
            });
            return Err(ChatError::RunFailed {
                status: run.status,
                reason,
            });
        }

        let messages = self.list_messages(cfg, &thread.id).await?;
        Ok(assistant_text(&messages))
    }
}

fn parse<R: DeserializeOwned>(body: String) -> Result<R, ChatError> {
    serde_json::from_str(&body).map_err(|e| ChatError::MalformedResponse(e.to_string()))
}
