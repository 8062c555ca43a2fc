use chrono::Utc;
use std::fmt;
use url::Url;

use crate::config::{OIDC_CLOCK_SKEW, OIDC_JWKS_CACHE_TTL};
use crate::session::SessionStore;
use crate::utils::build_http_client;

use super::config::StandardProviderConfig;
use super::core::{
    ClientAuth, TokenRequest, consume_pending_auth, exchange_code, parse_auth_url, start_auth,
};
use super::errors::{ProviderError, TokenVerificationError};
use super::idtoken::{ParsedIdToken, check_audience, check_nonce, verify_signed};
use super::jwks::KeySetCache;
use super::types::{CallbackParams, IdentityClaims};

/// Issuer whose ID tokens are RS256 signed with keys published as a JWKS,
/// such as Google.
pub struct StandardOidcProvider {
    config: StandardProviderConfig,
    auth_url: Url,
    client: reqwest::Client,
    keys: KeySetCache,
}

impl fmt::Debug for StandardOidcProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardOidcProvider")
            .field("name", &self.config.name)
            .field("client_id", &self.config.client_id)
            .field("jwks_url", &self.config.jwks_url)
            .finish()
    }
}

impl StandardOidcProvider {
    pub fn new(config: StandardProviderConfig) -> Result<Self, ProviderError> {
        let auth_url = parse_auth_url(&config.name, &config.auth_url)?;
        let client = build_http_client()?;
        let keys = KeySetCache::new(&config.jwks_url, *OIDC_JWKS_CACHE_TTL);
        Ok(Self {
            config,
            auth_url,
            client,
            keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[tracing::instrument(skip_all, fields(provider = %self.config.name))]
    pub async fn new_auth(&self, session: &dyn SessionStore) -> Result<String, ProviderError> {
        start_auth(
            &self.config.name,
            &self.auth_url,
            &self.config.client_id,
            &self.config.redirect_uri,
            &self.config.scope,
            session,
        )
        .await
    }

    #[tracing::instrument(skip_all, fields(provider = %self.config.name))]
    pub async fn callback(
        &self,
        params: &CallbackParams,
        session: &dyn SessionStore,
    ) -> Result<IdentityClaims, ProviderError> {
        let (code, pending) = consume_pending_auth(&self.config.name, params, session).await?;

        let tokens = exchange_code(
            &self.client,
            TokenRequest {
                token_url: &self.config.token_url,
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                redirect_uri: &self.config.redirect_uri,
                auth: ClientAuth::Form,
            },
            &code,
        )
        .await?;

        let id_token = match tokens.id_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ProviderError::validation("no id token")),
        };

        let parsed = self.verify(id_token).await?;
        let claims = parsed.claims;

        check_nonce(&claims, &pending.nonce)?;
        check_audience(&claims, &self.config.client_id)?;

        if !self.config.issuers.is_empty() {
            let iss_ok = claims
                .iss
                .as_deref()
                .is_some_and(|iss| self.config.issuers.iter().any(|i| i == iss));
            if !iss_ok {
                tracing::error!(iss = ?claims.iss, "Token issuer mismatch");
                return Err(ProviderError::validation("issuer mismatch"));
            }
        }

        let subject_id = match claims.sub {
            Some(sub) if !sub.is_empty() => sub,
            _ => return Err(ProviderError::validation("missing subject")),
        };

        tracing::info!(subject = %subject_id, "Id token verified");
        Ok(IdentityClaims {
            subject_id,
            display_name: claims.name.unwrap_or_default(),
            email: claims.email.unwrap_or_default(),
        })
    }

    /// Verify against the cached key set, refetching it once when the token
    /// names a key the cached set does not hold.
    async fn verify<'a>(&self, id_token: &'a str) -> Result<ParsedIdToken<'a>, ProviderError> {
        let now = Utc::now().timestamp();
        let skew = i64::try_from(*OIDC_CLOCK_SKEW).unwrap_or(i64::MAX);

        let (keys, fetched) = self.keys.get(&self.client).await?;
        match verify_signed(id_token, &keys, now, skew) {
            Err(TokenVerificationError::UnknownKeyId(kid)) if !fetched => {
                tracing::info!(kid = %kid, "Unknown key id, refetching key set");
                let keys = self.keys.refresh(&self.client).await?;
                Ok(verify_signed(id_token, &keys, now, skew)?)
            }
            result => Ok(result?),
        }
    }
}
