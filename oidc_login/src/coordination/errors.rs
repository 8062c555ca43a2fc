//! Error types for the login coordination layer

use http::StatusCode;
use thiserror::Error;

use crate::provider::{ErrorKind, ProviderError};
use crate::session::SessionError;
use crate::userdb::UserError;

/// Errors that can end a login, callback, or session lookup
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// Error from the identity provider flow
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// The local user record could not be created
    #[error("Provisioning error: {0}")]
    Provisioning(UserError),

    /// Error from the user database outside of provisioning
    #[error("User error: {0}")]
    User(UserError),

    /// Error from the session collaborator
    #[error("Session error: {0}")]
    Session(SessionError),
}

impl CoordinationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(err) => err.kind(),
            Self::Provisioning(_) => ErrorKind::Provisioning,
            Self::User(_) | Self::Session(_) => ErrorKind::Internal,
        }
    }

    /// Status for the browser: the request was at fault, or we were.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Protocol | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Network | ErrorKind::Provisioning | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text that is safe to show the browser. Validation details stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Protocol | ErrorKind::Validation => "Login failed. Please try again.",
            ErrorKind::Network => "The identity provider could not be reached.",
            ErrorKind::Provisioning | ErrorKind::Internal => "Internal server error",
        }
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Provider(err) => tracing::error!("Provider error: {}", err),
            Self::Provisioning(err) => tracing::error!("Provisioning error: {}", err),
            Self::User(err) => tracing::error!("User error: {}", err),
            Self::Session(err) => tracing::error!("Session error: {}", err),
        }
        self
    }
}

// Conversions log the full error, since callers only ever see client_message.

impl From<ProviderError> for CoordinationError {
    fn from(err: ProviderError) -> Self {
        let error = Self::Provider(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UserError> for CoordinationError {
    fn from(err: UserError) -> Self {
        let error = Self::User(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<SessionError> for CoordinationError {
    fn from(err: SessionError) -> Self {
        let error = Self::Session(err);
        tracing::error!("{}", error);
        error
    }
}
