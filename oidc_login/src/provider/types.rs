use serde::{Deserialize, Serialize};

/// Normalized result of a successful external login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Provider-scoped stable identifier; never empty
    pub subject_id: String,
    /// Human-readable name, empty when the provider does not supply one
    pub display_name: String,
    /// Email address, empty when the provider does not supply one
    pub email: String,
}

impl IdentityClaims {
    /// `<provider>:<subject>` key used to find the local user
    pub fn external_identity(&self, provider_name: &str) -> String {
        format!("{provider_name}:{}", self.subject_id)
    }
}

/// Parameters the issuer sends back on the redirect, from query or form body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub(super) id_token: Option<String>,
    pub(super) access_token: Option<String>,
    pub(super) token_type: Option<String>,
    pub(super) error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserInfoResponse {
    pub(super) user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// A list is only accepted when this client is its sole member.
    pub(super) fn is_exactly(&self, client_id: &str) -> bool {
        match self {
            Self::Single(aud) => aud == client_id,
            Self::Multiple(auds) => auds.len() == 1 && auds[0] == client_id,
        }
    }
}

/// The subset of ID token claims this crate reads
#[derive(Debug, Clone, Deserialize)]
pub(super) struct IdTokenClaims {
    pub(super) iss: Option<String>,
    pub(super) sub: Option<String>,
    pub(super) aud: Option<Audience>,
    pub(super) nonce: Option<String>,
    pub(super) name: Option<String>,
    pub(super) email: Option<String>,
    pub(super) exp: Option<i64>,
    pub(super) nbf: Option<i64>,
}
