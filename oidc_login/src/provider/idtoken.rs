use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use crate::utils::{base64url_decode, secure_eq};

use super::errors::{ProviderError, TokenVerificationError};
use super::jwks::KeySet;
use super::types::IdTokenClaims;

const EXPECTED_ALG: &str = "RS256";

#[derive(Debug, Deserialize)]
pub(super) struct IdTokenHeader {
    pub(super) alg: String,
    pub(super) kid: Option<String>,
}

/// A token split into its parts with header and claims decoded but nothing
/// verified yet.
#[derive(Debug)]
pub(super) struct ParsedIdToken<'a> {
    pub(super) header: IdTokenHeader,
    pub(super) claims: IdTokenClaims,
    signing_input: &'a str,
    signature: &'a str,
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, TokenVerificationError> {
    let bytes = base64url_decode(segment)
        .map_err(|_| TokenVerificationError::Malformed(format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenVerificationError::Malformed(format!("{what} is not valid JSON: {e}")))
}

/// Split and decode a compact JWS without checking the signature.
pub(super) fn parse(token: &str) -> Result<ParsedIdToken<'_>, TokenVerificationError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(TokenVerificationError::Malformed(
            "expected three dot-separated parts".to_string(),
        ));
    }

    let header: IdTokenHeader = decode_segment(parts[0], "header")?;
    let claims: IdTokenClaims = decode_segment(parts[1], "payload")?;
    let signing_input_len = parts[0].len() + 1 + parts[1].len();

    Ok(ParsedIdToken {
        header,
        claims,
        signing_input: &token[..signing_input_len],
        signature: parts[2],
    })
}

impl ParsedIdToken<'_> {
    /// Reject anything but RS256, including "none" and the HMAC family.
    pub(super) fn require_expected_alg(&self) -> Result<(), TokenVerificationError> {
        if self.header.alg != EXPECTED_ALG {
            return Err(TokenVerificationError::UnexpectedAlgorithm(
                self.header.alg.clone(),
            ));
        }
        Ok(())
    }

    pub(super) fn kid(&self) -> Result<&str, TokenVerificationError> {
        self.header
            .kid
            .as_deref()
            .ok_or(TokenVerificationError::MissingKeyId)
    }

    pub(super) fn check_temporal(&self, now: i64, skew: i64) -> Result<(), TokenVerificationError> {
        let exp = self
            .claims
            .exp
            .ok_or_else(|| TokenVerificationError::Malformed("missing exp claim".to_string()))?;

        if now.saturating_sub(skew) > exp {
            return Err(TokenVerificationError::ExpiredOrNotYetValid(format!(
                "expired at {exp}, now {now}"
            )));
        }
        if let Some(nbf) = self.claims.nbf {
            if now.saturating_add(skew) < nbf {
                return Err(TokenVerificationError::ExpiredOrNotYetValid(format!(
                    "not valid before {nbf}, now {now}"
                )));
            }
        }
        Ok(())
    }

    pub(super) fn verify_signature(&self, key: &DecodingKey) -> Result<(), TokenVerificationError> {
        match jsonwebtoken::crypto::verify(
            self.signature,
            self.signing_input.as_bytes(),
            key,
            Algorithm::RS256,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(TokenVerificationError::InvalidSignature),
            Err(e) => {
                tracing::debug!(error = %e, "Signature verification failed");
                Err(TokenVerificationError::InvalidSignature)
            }
        }
    }
}

/// Full structural, temporal and cryptographic check of an RS256 token.
///
/// Failures are reported in priority order: malformed, then expired or not
/// yet valid, then bad signature.
pub(super) fn verify_signed<'a>(
    token: &'a str,
    keys: &KeySet,
    now: i64,
    skew: i64,
) -> Result<ParsedIdToken<'a>, TokenVerificationError> {
    let parsed = parse(token)?;
    parsed.require_expected_alg()?;

    let kid = parsed.kid()?;
    parsed.check_temporal(now, skew)?;

    let key = keys
        .get(kid)
        .ok_or_else(|| TokenVerificationError::UnknownKeyId(kid.to_string()))?;
    parsed.verify_signature(key)?;

    Ok(parsed)
}

/// The nonce claim must echo the value stored when the login started.
pub(super) fn check_nonce(claims: &IdTokenClaims, expected: &str) -> Result<(), ProviderError> {
    match claims.nonce.as_deref() {
        Some(nonce) if secure_eq(nonce, expected) => Ok(()),
        other => {
            tracing::error!(token_nonce = ?other, "Nonce in id token does not match stored nonce");
            Err(ProviderError::protocol("csrf nonce mismatch"))
        }
    }
}

pub(super) fn check_audience(claims: &IdTokenClaims, client_id: &str) -> Result<(), ProviderError> {
    match &claims.aud {
        Some(aud) if aud.is_exactly(client_id) => Ok(()),
        other => {
            tracing::error!(aud = ?other, expected = %client_id, "Token audience mismatch");
            Err(ProviderError::validation("audience mismatch"))
        }
    }
}
