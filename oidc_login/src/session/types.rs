use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::errors::SessionError;
use crate::utils::{UtilError, gen_random_string};

/// Per-attempt values binding a callback to the login that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    pub nonce: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl PendingAuth {
    /// Fresh nonce and state, 32 random bytes each.
    pub fn generate() -> Result<Self, UtilError> {
        Ok(Self {
            nonce: gen_random_string(32)?,
            state: gen_random_string(32)?,
            created_at: Utc::now(),
        })
    }

    /// A TTL too large to represent never expires.
    pub fn is_expired(&self, ttl_secs: u64, now: DateTime<Utc>) -> bool {
        let deadline = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl));
        match deadline {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}

/// Request-scoped view of one browser session.
///
/// Pending logins are namespaced by provider name so that a Google login and
/// a PayPal login started from the same browser do not clobber each other.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Remove and return the pending login for `provider`.
    async fn take_pending_auth(&self, provider: &str)
    -> Result<Option<PendingAuth>, SessionError>;

    /// Store the pending login for `provider`, replacing any earlier one.
    async fn set_pending_auth(
        &self,
        provider: &str,
        pending: PendingAuth,
    ) -> Result<(), SessionError>;

    async fn user_id(&self) -> Result<Option<String>, SessionError>;

    async fn set_user_id(&self, user_id: &str) -> Result<(), SessionError>;

    async fn clear_user_id(&self) -> Result<(), SessionError>;
}
