use chrono::Utc;
use url::Url;

use crate::config::OIDC_PENDING_AUTH_TTL;
use crate::session::{PendingAuth, SessionStore};
use crate::utils::secure_eq;

use super::config::ConfigError;
use super::errors::ProviderError;
use super::relaxed::RelaxedOidcProvider;
use super::standard::StandardOidcProvider;
use super::types::{CallbackParams, IdentityClaims, TokenResponse};

/// How the client proves itself to the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ClientAuth {
    /// client_id and client_secret in the form body
    Form,
    /// HTTP basic authentication, form body without credentials
    Basic,
}

pub(super) struct TokenRequest<'a> {
    pub(super) token_url: &'a str,
    pub(super) client_id: &'a str,
    pub(super) client_secret: &'a str,
    pub(super) redirect_uri: &'a str,
    pub(super) auth: ClientAuth,
}

pub(super) fn parse_auth_url(name: &str, auth_url: &str) -> Result<Url, ConfigError> {
    Url::parse(auth_url).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

/// Store a fresh nonce and state for `provider` and return the redirect URL.
pub(super) async fn start_auth(
    provider: &str,
    auth_url: &Url,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    session: &dyn SessionStore,
) -> Result<String, ProviderError> {
    let pending = PendingAuth::generate()?;

    let mut url = auth_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("scope", scope)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("nonce", &pending.nonce)
        .append_pair("state", &pending.state);

    session.set_pending_auth(provider, pending).await?;

    tracing::debug!(provider, "Pending login stored");
    Ok(url.into())
}

/// Remove the pending login from the session and check the callback against it.
///
/// The entry is taken before anything else so that it is gone whether or not
/// the callback succeeds. A replayed callback therefore always fails here.
pub(super) async fn consume_pending_auth(
    provider: &str,
    params: &CallbackParams,
    session: &dyn SessionStore,
) -> Result<(String, PendingAuth), ProviderError> {
    let pending = session.take_pending_auth(provider).await?;

    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => {
            tracing::error!(provider, "Callback without authorization code");
            return Err(ProviderError::protocol("missing code"));
        }
    };

    let Some(pending) = pending else {
        tracing::error!(provider, "No pending login in session");
        return Err(ProviderError::protocol("csrf state mismatch"));
    };

    match params.state.as_deref() {
        Some(state) if secure_eq(state, &pending.state) => {}
        _ => {
            tracing::error!(provider, "State in callback does not match stored state");
            return Err(ProviderError::protocol("csrf state mismatch"));
        }
    }

    if pending.is_expired(*OIDC_PENDING_AUTH_TTL, Utc::now()) {
        tracing::error!(provider, created_at = %pending.created_at, "Pending login expired");
        return Err(ProviderError::protocol("pending login expired"));
    }

    Ok((code, pending))
}

/// Trade the authorization code for tokens at the issuer's token endpoint.
pub(super) async fn exchange_code(
    client: &reqwest::Client,
    request: TokenRequest<'_>,
    code: &str,
) -> Result<TokenResponse, ProviderError> {
    let builder = client.post(request.token_url);
    let builder = match request.auth {
        ClientAuth::Form => builder.form(&[
            ("code", code),
            ("client_id", request.client_id),
            ("client_secret", request.client_secret),
            ("redirect_uri", request.redirect_uri),
            ("grant_type", "authorization_code"),
        ]),
        ClientAuth::Basic => builder
            .basic_auth(request.client_id, Some(request.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", request.redirect_uri),
            ]),
    };

    let response = builder
        .send()
        .await
        .map_err(|e| ProviderError::Network(format!("Token exchange failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(format!("Could not read token response: {e}")))?;

    // Error bodies are decoded first so that the issuer's reason is kept.
    let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        ProviderError::Network(format!("Could not decode token response ({status}): {e}"))
    })?;

    if let Some(error) = &token_response.error {
        tracing::error!(%status, error = %error, "Token endpoint returned an error");
        return Err(ProviderError::Network(format!(
            "Token endpoint error: {error}"
        )));
    }
    if !status.is_success() {
        return Err(ProviderError::Network(format!(
            "Token endpoint returned {status}"
        )));
    }

    tracing::debug!(
        has_id_token = token_response.id_token.is_some(),
        has_access_token = token_response.access_token.is_some(),
        "Token exchange succeeded"
    );
    Ok(token_response)
}

/// The identity provider configured for this deployment.
///
/// Each variant carries its own validation rules; the choice is made once at
/// startup.
#[derive(Debug)]
pub enum Provider {
    Standard(StandardOidcProvider),
    Relaxed(RelaxedOidcProvider),
}

impl Provider {
    /// Prefix of the external identities this provider produces
    pub fn name(&self) -> &str {
        match self {
            Self::Standard(p) => p.name(),
            Self::Relaxed(p) => p.name(),
        }
    }

    /// Start a login and return the issuer URL to redirect the browser to.
    pub async fn new_auth(&self, session: &dyn SessionStore) -> Result<String, ProviderError> {
        match self {
            Self::Standard(p) => p.new_auth(session).await,
            Self::Relaxed(p) => p.new_auth(session).await,
        }
    }

    /// Finish a login from the issuer's redirect.
    pub async fn callback(
        &self,
        params: &CallbackParams,
        session: &dyn SessionStore,
    ) -> Result<IdentityClaims, ProviderError> {
        match self {
            Self::Standard(p) => p.callback(params, session).await,
            Self::Relaxed(p) => p.callback(params, session).await,
        }
    }
}

impl From<StandardOidcProvider> for Provider {
    fn from(provider: StandardOidcProvider) -> Self {
        Self::Standard(provider)
    }
}

impl From<RelaxedOidcProvider> for Provider {
    fn from(provider: RelaxedOidcProvider) -> Self {
        Self::Relaxed(provider)
    }
}
