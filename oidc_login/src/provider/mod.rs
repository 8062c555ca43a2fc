//! Identity providers
//!
//! A [`Provider`] runs the authorization-code flow against one issuer and
//! turns a successful redirect back into [`IdentityClaims`]. The standard
//! variant verifies the RS256 ID token against the issuer's JWKS. The relaxed
//! variant cannot, and asks the userinfo endpoint for the subject instead.

mod config;
mod core;
mod errors;
mod idtoken;
mod jwks;
mod relaxed;
mod standard;
mod types;

pub use config::{ConfigError, RelaxedProviderConfig, StandardProviderConfig};
pub use self::core::Provider;
pub use errors::{ErrorKind, ProviderError, TokenVerificationError};
pub use relaxed::RelaxedOidcProvider;
pub use standard::StandardOidcProvider;
pub use types::{CallbackParams, IdentityClaims};
