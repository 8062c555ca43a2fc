//! Settings for the HTTP adapter

use std::sync::LazyLock;

/// Name of the cookie carrying the browser's session id
/// Default: "oidc_session"
pub static OIDC_SESSION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    std::env::var("OIDC_SESSION_COOKIE_NAME").unwrap_or_else(|_| "oidc_session".to_string())
});

/// Whether the session cookie is marked `Secure`
/// Default: true
pub static OIDC_SESSION_COOKIE_SECURE: LazyLock<bool> = LazyLock::new(|| {
    parse_flag(std::env::var("OIDC_SESSION_COOKIE_SECURE").ok().as_deref())
});

/// Lifetime of a browser session, from creation or from sign-in.
/// Default: 600 seconds
pub static OIDC_SESSION_MAX_AGE: LazyLock<u64> =
    LazyLock::new(|| env_secs("OIDC_SESSION_MAX_AGE", 600));

/// Where the browser lands after a completed login
/// Default: "/"
pub static OIDC_REDIRECT_AFTER_LOGIN: LazyLock<String> = LazyLock::new(|| {
    std::env::var("OIDC_REDIRECT_AFTER_LOGIN").unwrap_or_else(|_| "/".to_string())
});

/// Where the browser lands after logging out
/// Default: "/"
pub static OIDC_REDIRECT_AFTER_LOGOUT: LazyLock<String> = LazyLock::new(|| {
    std::env::var("OIDC_REDIRECT_AFTER_LOGOUT").unwrap_or_else(|_| "/".to_string())
});

/// Upper bound for a session lifetime: one year.
const MAX_SESSION_SECS: u64 = 365 * 24 * 60 * 60;

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
        .min(MAX_SESSION_SECS)
}

/// Anything but "false" (case-insensitive) enables the flag.
fn parse_flag(value: Option<&str>) -> bool {
    value.map(|v| v.to_lowercase() != "false").unwrap_or(true)
}
