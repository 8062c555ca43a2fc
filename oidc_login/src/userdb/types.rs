use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::userdb::errors::UserError;

/// A local account mapped from one external identity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    /// Unique user identifier, assigned at creation
    pub id: String,
    /// `<provider>:<subject>` key this account was created from
    pub external_identity: String,
    /// Display name taken from the first login; never overwritten afterwards
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh identifier
    pub fn new(external_identity: String, username: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_identity,
            username,
            email: String::new(),
            created_at: now,
            last_login: now,
        }
    }
}

/// Persistence collaborator for [`User`] records.
///
/// Implementations must enforce uniqueness of `external_identity` and report
/// a violation from [`UserStore::create`] as [`UserError::Duplicate`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_external_identity(
        &self,
        external_identity: &str,
    ) -> Result<Option<User>, UserError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError>;

    async fn create(&self, user: User) -> Result<(), UserError>;

    async fn update_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), UserError>;
}
