use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_INPUT_NAME: &str = "chat_input";
pub const DEFAULT_OUTPUT_NAME: &str = "chat_output";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-35-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful Azure Chatbot assistant that answer questions about the Azure.";

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind host (e.g., 0.0.0.0)
    pub app_host: String,
    /// HTTP bind port (e.g., 8080)
    pub app_port: u16,

    /// Which completion backend serves requests. Fixed for the process lifetime.
    pub backend: BackendKind,

    /// Outbound request timeout applied to the shared HTTP client.
    pub request_timeout: Duration,
    /// Skip TLS certificate validation on outbound calls. Off unless set explicitly.
    pub accept_invalid_certs: bool,

    /// Reloadable part of the configuration.
    pub chat: ChatConfig,
}

/// Per-request snapshot read by the completion backends.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Remote chat service URL (e.g., https://example.azurewebsites.net/score)
    pub endpoint_url: Url,
    pub api_key: String,
    /// JSON field the direct backend writes the prompt into.
    pub input_name: String,
    /// JSON field the direct backend reads the answer from.
    pub output_name: String,
    /// Agent the thread backend runs against.
    pub agent_id: Option<String>,
    /// Optional `api-version` query parameter for agent and openai calls.
    pub api_version: Option<String>,

    pub deployment: String,
    pub system_prompt: String,

    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Single POST of `{input_name: prompt}` to the endpoint.
    Direct,
    /// Thread / message / run workflow against an agents API.
    Thread,
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Direct => "direct",
            BackendKind::Thread => "thread",
            BackendKind::OpenAi => "openai",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(BackendKind::Direct),
            "thread" | "agent" => Ok(BackendKind::Thread),
            "openai" => Ok(BackendKind::OpenAi),
            other => Err(ConfigError::Other(format!("Unknown CHAT_BACKEND: {other}"))),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid URL for {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("Invalid number for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("General error: {0}")]
    Other(String),
}

/// Process environment first, then `.env` values. Startup and reload both
/// resolve keys through this, so they agree on precedence.
pub fn layered_lookup<E>(
    env_var: E,
    dotenv: HashMap<String, String>,
) -> impl Fn(&'static str) -> Option<String>
where
    E: Fn(&'static str) -> Option<String>,
{
    move |key| env_var(key).or_else(|| dotenv.get(key).cloned())
}

/// Lookup over the live environment and a fresh read of `.env`, if present.
/// The process environment itself is never modified.
pub fn env_lookup() -> impl Fn(&'static str) -> Option<String> {
    let dotenv = match dotenvy::dotenv_iter() {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => HashMap::new(),
    };
    layered_lookup(|key: &'static str| env::var(key).ok(), dotenv)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let app_host = or_default(&lookup, "APP_HOST", "0.0.0.0");
        let app_port = parse_or_default::<u16, _>(&lookup, "APP_PORT", 8080)?;

        let backend = match optional(&lookup, "CHAT_BACKEND") {
            Some(v) => v.parse::<BackendKind>()?,
            None => BackendKind::Direct,
        };

        let request_timeout =
            Duration::from_secs(parse_or_default(&lookup, "CHAT_REQUEST_TIMEOUT_SECS", 30)?);
        let accept_invalid_certs =
            parse_bool_or_default(&lookup, "CHAT_ACCEPT_INVALID_CERTS", false)?;

        let chat = ChatConfig::load_for(&lookup, backend)?;

        Ok(Self {
            app_host,
            app_port,
            backend,
            request_timeout,
            accept_invalid_certs,
            chat,
        })
    }
}

impl ChatConfig {
    /// Parses the chat section and validates it for `backend`.
    /// Used both at startup and on reload.
    pub fn load_for<F>(lookup: &F, backend: BackendKind) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let chat = Self::from_lookup(lookup)?;
        chat.validate_for(backend)?;
        Ok(chat)
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let endpoint_url = parse_url_required(lookup, "CHAT_API_ENDPOINT")?;
        let api_key = required(lookup, "CHAT_API_KEY")?;

        let input_name = or_default(lookup, "CHAT_INPUT_NAME", DEFAULT_INPUT_NAME);
        let output_name = or_default(lookup, "CHAT_OUTPUT_NAME", DEFAULT_OUTPUT_NAME);
        let agent_id = optional(lookup, "CHAT_AGENT_ID");
        let api_version = optional(lookup, "CHAT_API_VERSION");

        let deployment = or_default(lookup, "CHAT_DEPLOYMENT", DEFAULT_DEPLOYMENT);
        let system_prompt = or_default(lookup, "CHAT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT);

        let poll_interval =
            Duration::from_millis(parse_or_default(lookup, "CHAT_POLL_INTERVAL_MS", 500)?);
        let poll_timeout =
            Duration::from_secs(parse_or_default(lookup, "CHAT_POLL_TIMEOUT_SECS", 60)?);

        Ok(Self {
            endpoint_url,
            api_key,
            input_name,
            output_name,
            agent_id,
            api_version,
            deployment,
            system_prompt,
            poll_interval,
            poll_timeout,
        })
    }

    /// Checks the fields a given backend cannot run without.
    pub fn validate_for(&self, backend: BackendKind) -> Result<(), ConfigError> {
        if backend == BackendKind::Thread && self.agent_id.is_none() {
            return Err(ConfigError::MissingVar("CHAT_AGENT_ID"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Other(
                "CHAT_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::Other(
                "CHAT_POLL_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/* --------------------------- helpers --------------------------- */

fn optional<F>(lookup: &F, key: &'static str) -> Option<String>
where
    F: Fn(&'static str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    optional(lookup, key).ok_or(ConfigError::MissingVar(key))
}

fn or_default<F>(lookup: &F, key: &'static str, default: &'static str) -> String
where
    F: Fn(&'static str) -> Option<String>,
{
    optional(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_or_default<T: FromStr, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match optional(lookup, key) {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            name: key,
            value: v,
        }),
        None => Ok(default),
    }
}

fn parse_bool_or_default<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match optional(lookup, key) {
        Some(v) => {
            let vv = v.to_lowercase();
            match vv.as_str() {
                "1" | "true" | "yes" | "y" => Ok(true),
                "0" | "false" | "no" | "n" => Ok(false),
                _ => Err(ConfigError::Other(format!("Invalid bool for {key}: {v}"))),
            }
        }
        None => Ok(default),
    }
}

fn parse_url_required<F>(lookup: &F, key: &'static str) -> Result<Url, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let raw = required(lookup, key)?;
    match Url::parse(&raw) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            name: key,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "https://chat.example.com/score"),
            ("CHAT_API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(cfg.app_host, "0.0.0.0");
        assert_eq!(cfg.app_port, 8080);
        assert_eq!(cfg.backend, BackendKind::Direct);
        assert!(!cfg.accept_invalid_certs);
        assert_eq!(cfg.chat.input_name, "chat_input");
        assert_eq!(cfg.chat.output_name, "chat_output");
        assert_eq!(cfg.chat.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.chat.poll_timeout, Duration::from_secs(60));
        assert_eq!(cfg.chat.deployment, DEFAULT_DEPLOYMENT);
        assert!(cfg.chat.agent_id.is_none());
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = Config::from_lookup(lookup_from(&[(
            "CHAT_API_ENDPOINT",
            "https://chat.example.com/score",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("CHAT_API_KEY")));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "https://chat.example.com/score"),
            ("CHAT_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("CHAT_API_KEY")));
    }

    #[test]
    fn invalid_endpoint_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "not a url"),
            ("CHAT_API_KEY", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { name: "CHAT_API_ENDPOINT", .. }));
    }

    #[test]
    fn thread_backend_requires_agent_id() {
        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_BACKEND", "thread"),
            ("CHAT_API_ENDPOINT", "https://agents.example.com"),
            ("CHAT_API_KEY", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("CHAT_AGENT_ID")));

        let cfg = Config::from_lookup(lookup_from(&[
            ("CHAT_BACKEND", "Thread"),
            ("CHAT_API_ENDPOINT", "https://agents.example.com"),
            ("CHAT_API_KEY", "secret"),
            ("CHAT_AGENT_ID", "asst_123"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend, BackendKind::Thread);
        assert_eq!(cfg.chat.agent_id.as_deref(), Some("asst_123"));
    }

    #[test]
    fn cert_bypass_and_numbers_are_parsed() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "https://chat.example.com"),
            ("CHAT_API_KEY", "secret"),
            ("CHAT_ACCEPT_INVALID_CERTS", "yes"),
            ("CHAT_POLL_INTERVAL_MS", "25"),
            ("APP_PORT", "9000"),
        ]))
        .unwrap();
        assert!(cfg.accept_invalid_certs);
        assert_eq!(cfg.chat.poll_interval, Duration::from_millis(25));
        assert_eq!(cfg.app_port, 9000);

        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "https://chat.example.com"),
            ("CHAT_API_KEY", "secret"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "APP_PORT", .. }));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_API_ENDPOINT", "https://chat.example.com"),
            ("CHAT_API_KEY", "secret"),
            ("CHAT_POLL_INTERVAL_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Other(ref m) if m.contains("CHAT_POLL_INTERVAL_MS")));
    }

    #[test]
    fn process_env_wins_over_dotenv_values() {
        let dotenv: HashMap<String, String> = [
            ("CHAT_API_KEY", "dotenv-key"),
            ("CHAT_API_ENDPOINT", "https://stale.example.com"),
            ("CHAT_OUTPUT_NAME", "answer"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let lookup = layered_lookup(
            lookup_from(&[
                ("CHAT_API_KEY", "env-key"),
                ("CHAT_API_ENDPOINT", "https://live.example.com"),
            ]),
            dotenv,
        );

        let startup = Config::from_lookup(&lookup).unwrap();
        let reloaded = ChatConfig::load_for(&lookup, startup.backend).unwrap();

        assert_eq!(startup.chat, reloaded);
        assert_eq!(reloaded.api_key, "env-key");
        assert_eq!(reloaded.endpoint_url.as_str(), "https://live.example.com/");
        // Keys missing from the process env still fall back to `.env`.
        assert_eq!(reloaded.output_name, "answer");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("CHAT_BACKEND", "smoke-signals"),
            ("CHAT_API_ENDPOINT", "https://chat.example.com"),
            ("CHAT_API_KEY", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Other(_)));
    }
}
