mod apidoc;
mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod synch;
mod utils;

use std::sync::Arc;

use axum::{Router, routing::post};
use config::{BackendKind, Config, env_lookup};
use services::CompletionBackend;
use synch::config_cell::ConfigCell;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigCell>,
    pub backend: Arc<dyn CompletionBackend>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat/completions", post(routes::chat::completions))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", apidoc::ApiDoc::openapi()))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env().expect("Failed to load configuration");
    let http = services::build_http_client(&cfg).expect("Failed to build HTTP client");
    let addr = format!("{}:{}", cfg.app_host, cfg.app_port);

    // Cancelled on shutdown so in-flight run polls stop waiting.
    let shutdown = CancellationToken::new();

    let backend = services::build_backend(cfg.backend, http, shutdown.clone());
    let config = Arc::new(ConfigCell::new(cfg.chat.clone()));

    #[cfg(unix)]
    spawn_reload_on_sighup(config.clone(), cfg.backend);

    let state = AppState { config, backend };
    let app = router(state);

    let listener = TcpListener::bind(&addr).await.unwrap();

    info!(
        backend = cfg.backend.as_str(),
        "Chat relay listening on http://{addr}"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .unwrap();
}

/// Re-reads the chat settings on SIGHUP. An invalid reload keeps the current snapshot.
#[cfg(unix)]
fn spawn_reload_on_sighup(config: Arc<ConfigCell>, backend: BackendKind) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                warn!("Config reload disabled, cannot listen for SIGHUP: {}", err);
                return;
            }
        };

        while hangup.recv().await.is_some() {
            match config.reload_with(&env_lookup(), backend).await {
                Ok(changed) => info!(changed, "Reloaded chat configuration"),
                Err(err) => warn!("Ignoring invalid configuration reload: {}", err),
            }
        }
    });
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
    token.cancel();
}
