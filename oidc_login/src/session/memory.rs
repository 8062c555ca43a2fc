use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::session::errors::SessionError;
use crate::session::types::{PendingAuth, SessionStore};

#[derive(Debug, Default)]
struct SessionData {
    pending: HashMap<String, PendingAuth>,
    user_id: Option<String>,
}

/// In-process session. Cloning shares the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    inner: Arc<Mutex<SessionData>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a login for `provider` is still waiting for its callback.
    pub async fn has_pending_auth(&self, provider: &str) -> bool {
        self.inner.lock().await.pending.contains_key(provider)
    }

    /// Read the pending login without consuming it.
    pub async fn peek_pending_auth(&self, provider: &str) -> Option<PendingAuth> {
        self.inner.lock().await.pending.get(provider).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn take_pending_auth(
        &self,
        provider: &str,
    ) -> Result<Option<PendingAuth>, SessionError> {
        Ok(self.inner.lock().await.pending.remove(provider))
    }

    async fn set_pending_auth(
        &self,
        provider: &str,
        pending: PendingAuth,
    ) -> Result<(), SessionError> {
        self.inner
            .lock()
            .await
            .pending
            .insert(provider.to_string(), pending);
        Ok(())
    }

    async fn user_id(&self) -> Result<Option<String>, SessionError> {
        Ok(self.inner.lock().await.user_id.clone())
    }

    async fn set_user_id(&self, user_id: &str) -> Result<(), SessionError> {
        self.inner.lock().await.user_id = Some(user_id.to_string());
        Ok(())
    }

    async fn clear_user_id(&self) -> Result<(), SessionError> {
        self.inner.lock().await.user_id = None;
        Ok(())
    }
}
