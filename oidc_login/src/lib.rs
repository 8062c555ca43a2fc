//! oidc_login - OpenID Connect login engine
//!
//! This crate starts a login with a third-party identity provider, checks the
//! redirect that comes back, and maps the verified identity onto a local user
//! record. HTTP routing and cookie handling are left to the caller; see the
//! `oidc-login-axum` crate for an adapter.

mod config;
mod coordination;
mod provider;
mod session;
mod userdb;
mod utils;

pub use config::{OIDC_CLOCK_SKEW, OIDC_HTTP_TIMEOUT, OIDC_JWKS_CACHE_TTL, OIDC_PENDING_AUTH_TTL};

pub use coordination::{AuthFlowState, AuthOrchestrator, CoordinationError};

pub use provider::{
    CallbackParams, ConfigError, ErrorKind, IdentityClaims, Provider, ProviderError,
    RelaxedOidcProvider, RelaxedProviderConfig, StandardOidcProvider, StandardProviderConfig,
    TokenVerificationError,
};

pub use session::{MemorySession, PendingAuth, SessionError, SessionStore};

pub use userdb::{
    InMemoryUserStore, PostgresUserStore, SqliteUserStore, User, UserError, UserStore,
};

pub use utils::{UtilError, gen_random_string};
