use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::OIDC_HTTP_TIMEOUT;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub(crate) fn base64url_encode(input: Vec<u8>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Generate `len` bytes from the system CSPRNG, base64url encoded.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(base64url_encode(buf))
}

/// Compare two secrets without leaking the position of the first difference.
pub(crate) fn secure_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Creates the HTTP client used for every issuer call.
///
/// - `timeout`: `OIDC_HTTP_TIMEOUT` seconds. A request that exceeds it fails
///   as a transport error and is reported as a network failure.
/// - `pool_idle_timeout`: 90 seconds.
/// - `pool_max_idle_per_host`: 32.
pub(crate) fn build_http_client() -> Result<reqwest::Client, UtilError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(*OIDC_HTTP_TIMEOUT))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| UtilError::HttpClient(e.to_string()))
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Http client error: {0}")]
    HttpClient(String),
}
