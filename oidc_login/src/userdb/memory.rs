use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::userdb::errors::UserError;
use crate::userdb::types::{User, UserStore};

/// Map-backed store, mainly for tests and single-process demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory user store");
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_external_identity(
        &self,
        external_identity: &str,
    ) -> Result<Option<User>, UserError> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|u| u.external_identity == external_identity)
            .cloned())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn create(&self, user: User) -> Result<(), UserError> {
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|u| u.external_identity == user.external_identity)
        {
            return Err(UserError::Duplicate(user.external_identity));
        }
        if users.contains_key(&user.id) {
            return Err(UserError::Storage(format!("User id {} already taken", user.id)));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), UserError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(id).ok_or(UserError::NotFound)?;
        user.last_login = at;
        Ok(())
    }
}
