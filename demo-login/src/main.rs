use axum::{Router, routing::get};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oidc_login::{
    ConfigError, Provider, RelaxedOidcProvider, RelaxedProviderConfig, SqliteUserStore,
    StandardOidcProvider, StandardProviderConfig,
};
use oidc_login_axum::{OidcLoginState, oidc_login_router};

mod handlers;

use crate::handlers::{index, protected};

const AUTH_ROUTE_PREFIX: &str = "/auth";

/// `None` when the provider's credentials are absent; any other problem is fatal.
fn google() -> Result<Option<Provider>, Box<dyn std::error::Error>> {
    match StandardProviderConfig::from_env() {
        Ok(config) => Ok(Some(StandardOidcProvider::new(config)?.into())),
        Err(ConfigError::Missing(var)) => {
            tracing::debug!(var = %var, "Google variable missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn paypal() -> Result<Option<Provider>, Box<dyn std::error::Error>> {
    match RelaxedProviderConfig::from_env() {
        Ok(config) => Ok(Some(RelaxedOidcProvider::new(config)?.into())),
        Err(ConfigError::Missing(var)) => {
            tracing::debug!(var = %var, "PayPal variable missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,oidc_login=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_url =
        std::env::var("OIDC_USER_DB_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let users = Arc::new(SqliteUserStore::connect(&db_url).await?);

    let mut state = OidcLoginState::new(users);
    for provider in [google()?, paypal()?].into_iter().flatten() {
        tracing::info!(provider = provider.name(), "Provider enabled");
        state = state.with_provider(provider);
    }
    if state.provider_names().is_empty() {
        tracing::warn!("No identity provider configured; set OIDC_GOOGLE_* or OIDC_PAYPAL_*");
    }

    let app = Router::new()
        .route("/", get(index))
        .route("/protected", get(protected))
        .with_state(state.clone())
        .nest(AUTH_ROUTE_PREFIX, oidc_login_router(state));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
