use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::{BackendKind, ChatConfig, ConfigError};

/// Holds the live chat configuration.
///
/// Readers take an `Arc` snapshot and keep it for the whole request, so a
/// reload never changes settings halfway through a completion.
pub struct ConfigCell {
    current: RwLock<Arc<ChatConfig>>,
}

impl ConfigCell {
    pub fn new(initial: ChatConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub async fn snapshot(&self) -> Arc<ChatConfig> {
        self.current.read().await.clone()
    }

    /// Loads and validates a new chat section for `backend`. On error the
    /// current snapshot stays in place. Returns whether anything changed.
    pub async fn reload_with<F>(&self, lookup: &F, backend: BackendKind) -> Result<bool, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let next = ChatConfig::load_for(lookup, backend)?;

        let mut guard = self.current.write().await;
        if **guard == next {
            return Ok(false);
        }
        *guard = Arc::new(next);
        Ok(true)
    }
}
