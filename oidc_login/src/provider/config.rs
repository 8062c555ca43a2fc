use std::env;
use thiserror::Error;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";
const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

const PAYPAL_AUTH_URL: &str =
    "https://www.sandbox.paypal.com/webapps/auth/protocol/openidconnect/v1/authorize";
const PAYPAL_TOKEN_URL: &str =
    "https://api.sandbox.paypal.com/v1/identity/openidconnect/tokenservice";
const PAYPAL_USERINFO_URL: &str =
    "https://api.sandbox.paypal.com/v1/identity/openidconnect/userinfo/?schema=openid";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),

    #[error("Invalid url for {0}: {1}")]
    InvalidUrl(String, String),
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn with_override(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Settings for an issuer that signs ID tokens with published RSA keys
#[derive(Debug, Clone)]
pub struct StandardProviderConfig {
    /// Prefix of the external identity, e.g. "google"
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub jwks_url: String,
    /// Accepted `iss` values. Empty disables the check.
    pub issuers: Vec<String>,
}

impl StandardProviderConfig {
    pub fn google(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            name: "google".to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            // profile carries the name claim, so no userinfo request is needed
            scope: "openid profile".to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Google settings from `OIDC_GOOGLE_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::google(
            &required("OIDC_GOOGLE_CLIENT_ID")?,
            &required("OIDC_GOOGLE_CLIENT_SECRET")?,
            &required("OIDC_GOOGLE_REDIRECT_URI")?,
        );
        config.auth_url = with_override("OIDC_GOOGLE_AUTH_URL", GOOGLE_AUTH_URL);
        config.token_url = with_override("OIDC_GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL);
        config.jwks_url = with_override("OIDC_GOOGLE_JWKS_URL", GOOGLE_JWKS_URL);
        Ok(config)
    }
}

/// Settings for an issuer whose ID tokens cannot be verified and which
/// exposes the subject only through its userinfo endpoint
#[derive(Debug, Clone)]
pub struct RelaxedProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl RelaxedProviderConfig {
    pub fn paypal_sandbox(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            name: "paypal".to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope: "openid".to_string(),
            auth_url: PAYPAL_AUTH_URL.to_string(),
            token_url: PAYPAL_TOKEN_URL.to_string(),
            userinfo_url: PAYPAL_USERINFO_URL.to_string(),
        }
    }

    /// PayPal settings from `OIDC_PAYPAL_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::paypal_sandbox(
            &required("OIDC_PAYPAL_CLIENT_ID")?,
            &required("OIDC_PAYPAL_CLIENT_SECRET")?,
            &required("OIDC_PAYPAL_REDIRECT_URI")?,
        );
        config.auth_url = with_override("OIDC_PAYPAL_AUTH_URL", PAYPAL_AUTH_URL);
        config.token_url = with_override("OIDC_PAYPAL_TOKEN_URL", PAYPAL_TOKEN_URL);
        config.userinfo_url = with_override("OIDC_PAYPAL_USERINFO_URL", PAYPAL_USERINFO_URL);
        Ok(config)
    }
}
