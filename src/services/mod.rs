use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{BackendKind, ChatConfig, Config};
use crate::error::ChatError;

pub mod agents;
pub mod direct;
pub mod openai;

/// Talks to the remote chat service and returns the answer text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str, cfg: &ChatConfig) -> Result<String, ChatError>;
}

/// Builds the pooled client shared by every backend.
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(cfg.request_timeout);
    if cfg.accept_invalid_certs {
        warn!("TLS certificate validation is DISABLED for outbound chat calls (CHAT_ACCEPT_INVALID_CERTS)");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build()
}

pub fn build_backend(
    kind: BackendKind,
    http: reqwest::Client,
    shutdown: CancellationToken,
) -> Arc<dyn CompletionBackend> {
    match kind {
        BackendKind::Direct => Arc::new(direct::DirectBackend::new(http)),
        BackendKind::Thread => Arc::new(agents::ThreadBackend::new(http, shutdown)),
        BackendKind::OpenAi => Arc::new(openai::OpenAiBackend::new(http)),
    }
}

/// Appends path segments (and `api-version`, if configured) to the endpoint.
pub(crate) fn api_url(cfg: &ChatConfig, segments: &[&str]) -> Url {
    let mut url = cfg.endpoint_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    if let Some(version) = &cfg.api_version {
        url.query_pairs_mut().append_pair("api-version", version);
    }
    url
}

/// Logs the status, reads the body and turns non-2xx statuses into `ChatError::Upstream`.
pub(crate) async fn read_body(res: reqwest::Response) -> Result<String, ChatError> {
    let status = res.status();
    info!("Http request status code: {}", status);
    let headers = res.headers().clone();
    let body = res.text().await?;

    if !status.is_success() {
        for (key, value) in headers.iter() {
            debug!("{}: {}", key, value.to_str().unwrap_or("<binary>"));
        }
        return Err(ChatError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
