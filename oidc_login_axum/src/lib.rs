//! oidc_login_axum - Axum routes for the oidc_login engine
//!
//! Mount [`oidc_login_router`] with an [`OidcLoginState`] holding the
//! configured providers. Browser sessions are kept server-side and keyed by
//! an `HttpOnly` cookie.

mod config;
mod error;
mod router;
mod session;
mod state;

pub use config::{
    OIDC_REDIRECT_AFTER_LOGIN, OIDC_REDIRECT_AFTER_LOGOUT, OIDC_SESSION_COOKIE_NAME,
    OIDC_SESSION_COOKIE_SECURE, OIDC_SESSION_MAX_AGE,
};
pub use router::oidc_login_router;
pub use session::{SessionRegistry, SignedInUser, Unauthorized};
pub use state::OidcLoginState;
