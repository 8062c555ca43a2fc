use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::userdb::errors::UserError;
use crate::userdb::types::{User, UserStore};

use super::config::DB_TABLE_USERS;

/// SQLite-backed user store. Uniqueness of `external_identity` is enforced by
/// a unique constraint on the column.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: Pool<Sqlite>,
}

impl SqliteUserStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Connect to `url` and make sure the users table exists.
    pub async fn connect(url: &str) -> Result<Self, UserError> {
        // Every connection to an in-memory database sees its own empty
        // database, so the pool must hold exactly one and never recycle it.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options
            .connect(url)
            .await
            .map_err(|e| UserError::Storage(e.to_string()))?;

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> Result<(), UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table_name} (
                id TEXT PRIMARY KEY,
                external_identity TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                last_login TIMESTAMP NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_external_identity(
        &self,
        external_identity: &str,
    ) -> Result<Option<User>, UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT * FROM {table_name} WHERE external_identity = ?
            "#
        ))
        .bind(external_identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT * FROM {table_name} WHERE id = ?
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: User) -> Result<(), UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        sqlx::query(&format!(
            r#"
            INSERT INTO {table_name} (id, external_identity, username, email, created_at, last_login)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        ))
        .bind(&user.id)
        .bind(&user.external_identity)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::from_sqlx(e, &user.external_identity))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        let result = sqlx::query(&format!(
            r#"
            UPDATE {table_name} SET last_login = ? WHERE id = ?
            "#
        ))
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }
}
