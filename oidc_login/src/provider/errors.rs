use thiserror::Error;

use crate::session::SessionError;
use crate::utils::UtilError;

use super::config::ConfigError;

/// Coarse classification used to decide what the browser is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or CSRF-inconsistent callback
    Protocol,
    /// Identity assertion failed a structural, temporal, signature or claim check
    Validation,
    /// The issuer could not be reached or answered with an error
    Network,
    /// The local user record could not be created
    Provisioning,
    /// Session or randomness failure inside this process
    Internal,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Id token error: {0}")]
    IdToken(#[from] TokenVerificationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Validation(_) | Self::IdToken(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::Network,
            Self::Session(_) | Self::Utils(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn protocol(msg: &str) -> Self {
        Self::Protocol(msg.to_string())
    }

    pub(crate) fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Why a signed ID token was rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenVerificationError {
    #[error("Id token is malformed: {0}")]
    Malformed(String),

    #[error("Id token is expired or not active yet: {0}")]
    ExpiredOrNotYetValid(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    #[error("Key id not found in token header")]
    MissingKeyId,

    #[error("No signing key found for kid: {0}")]
    UnknownKeyId(String),
}
