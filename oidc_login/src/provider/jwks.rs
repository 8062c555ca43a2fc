use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::errors::ProviderError;

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Key id to RSA verification key, built from an issuer's JWKS document
#[derive(Clone, Default)]
pub(crate) struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KeySet {
    /// Keys that are not usable for RS256 are skipped.
    pub(crate) fn from_jwks_json(body: &str) -> Result<Self, serde_json::Error> {
        let jwks: Jwks = serde_json::from_str(body)?;
        let mut keys = HashMap::new();

        for jwk in jwks.keys {
            let Some(kid) = jwk.kid else {
                tracing::debug!("Skipping JWK without kid");
                continue;
            };
            if jwk.kty != "RSA" || jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                tracing::debug!(kid = %kid, kty = %jwk.kty, "Skipping non RS256 JWK");
                continue;
            }
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::warn!(kid = %kid, "Skipping RSA JWK without modulus or exponent");
                continue;
            };
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "Skipping unusable RSA JWK"),
            }
        }

        Ok(Self { keys })
    }

    pub(crate) fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

struct CachedKeySet {
    keys: Arc<KeySet>,
    expires_at: DateTime<Utc>,
}

/// Per-issuer cache of the signing-key set.
///
/// A token naming an unknown kid triggers one forced refetch so that keys
/// rotated in by the issuer are picked up before the cache expires.
pub(crate) struct KeySetCache {
    url: String,
    ttl: Duration,
    entry: Mutex<Option<CachedKeySet>>,
}

impl KeySetCache {
    pub(crate) fn new(url: &str, ttl_secs: u64) -> Self {
        Self {
            url: url.to_string(),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            entry: Mutex::new(None),
        }
    }

    /// Returns the key set and whether it was fetched by this call.
    pub(crate) async fn get(
        &self,
        client: &reqwest::Client,
    ) -> Result<(Arc<KeySet>, bool), ProviderError> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.expires_at > Utc::now() {
                tracing::debug!("Returning valid cached JWKs");
                return Ok((cached.keys.clone(), false));
            }
            tracing::debug!("Cached JWKs expired");
        }

        let keys = self.fetch(client).await?;
        *entry = Some(CachedKeySet {
            keys: keys.clone(),
            expires_at: self.expiry(),
        });
        Ok((keys, true))
    }

    pub(crate) async fn refresh(
        &self,
        client: &reqwest::Client,
    ) -> Result<Arc<KeySet>, ProviderError> {
        let mut entry = self.entry.lock().await;
        let keys = self.fetch(client).await?;
        *entry = Some(CachedKeySet {
            keys: keys.clone(),
            expires_at: self.expiry(),
        });
        Ok(keys)
    }

    /// Saturates instead of overflowing for very long TTLs.
    fn expiry(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Arc<KeySet>, ProviderError> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Could not get keys from server: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Network(format!(
                "Key set endpoint returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Could not read key set: {e}")))?;
        let keys = KeySet::from_jwks_json(&body)
            .map_err(|e| ProviderError::Network(format!("Could not decode key set: {e}")))?;

        tracing::debug!(count = keys.len(), "JWKs fetched from issuer");
        Ok(Arc::new(keys))
    }
}
