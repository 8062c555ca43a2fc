use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::userdb::errors::UserError;
use crate::userdb::types::{User, UserStore};

use super::config::DB_TABLE_USERS;

/// PostgreSQL-backed user store
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Pool<Postgres>,
}

impl PostgresUserStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, UserError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
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
                created_at TIMESTAMPTZ NOT NULL,
                last_login TIMESTAMPTZ NOT NULL
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
impl UserStore for PostgresUserStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_external_identity(
        &self,
        external_identity: &str,
    ) -> Result<Option<User>, UserError> {
        let table_name = DB_TABLE_USERS.as_str();

        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT * FROM {table_name} WHERE external_identity = $1
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
            SELECT * FROM {table_name} WHERE id = $1
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
            VALUES ($1, $2, $3, $4, $5, $6)
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
            UPDATE {table_name} SET last_login = $1 WHERE id = $2
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
