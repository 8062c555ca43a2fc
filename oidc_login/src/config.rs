//! Process-wide tunables for the oidc_login crate

use std::sync::LazyLock;

/// Upper bound for every duration setting: ten years.
const MAX_SETTING_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
        .min(MAX_SETTING_SECS)
}

/// Maximum age of a pending login before its callback is refused.
/// Default: 300 seconds
pub static OIDC_PENDING_AUTH_TTL: LazyLock<u64> =
    LazyLock::new(|| env_secs("OIDC_PENDING_AUTH_TTL", 300));

/// How long a fetched signing-key set is reused before it is fetched again.
/// Default: 600 seconds
pub static OIDC_JWKS_CACHE_TTL: LazyLock<u64> =
    LazyLock::new(|| env_secs("OIDC_JWKS_CACHE_TTL", 600));

/// Timeout applied to every request sent to an issuer.
/// Default: 30 seconds
pub static OIDC_HTTP_TIMEOUT: LazyLock<u64> = LazyLock::new(|| env_secs("OIDC_HTTP_TIMEOUT", 30));

/// Tolerated clock difference when checking `exp` and `nbf`.
/// Default: 2 seconds
pub static OIDC_CLOCK_SKEW: LazyLock<u64> = LazyLock::new(|| env_secs("OIDC_CLOCK_SKEW", 2));
