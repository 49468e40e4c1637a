// study-relay/src/backend_target.rs
// Lock-free record of the LLM endpoint that last answered

use std::sync::Arc;
use arc_swap::ArcSwap;
use tracing::info;

/// Remembers which candidate base URL accepted the most recent request.
///
/// Purely informational: the prober always walks the configured list in
/// order, this only feeds `/status` and the logs.
#[derive(Clone, Default)]
pub struct BackendTarget {
    inner: Arc<ArcSwap<String>>,
}

impl BackendTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, base_url: &str) {
        let current = self.inner.load();

        if current.is_empty() {
            info!("🔄 LLM endpoint is live: {}", base_url);
            self.inner.store(Arc::new(base_url.to_string()));
        } else if current.as_str() != base_url {
            info!("🔄 LLM endpoint switched from {} → {}", current, base_url);
            self.inner.store(Arc::new(base_url.to_string()));
        }
    }

    /// Last endpoint that answered, if any has yet.
    pub fn get(&self) -> Option<String> {
        let current = self.inner.load();
        if current.is_empty() {
            None
        } else {
            Some(current.as_str().to_string())
        }
    }

    pub fn chat_completions_url(base_url: &str) -> String {
        format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
    }
}
