use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    /// Another record already owns this external identity.
    #[error("Duplicate external identity: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl UserError {
    /// Map a driver error, recognizing unique-index violations.
    pub(super) fn from_sqlx(err: sqlx::Error, external_identity: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                UserError::Duplicate(external_identity.to_string())
            }
            _ => UserError::Storage(err.to_string()),
        }
    }
}
