use chrono::Utc;
use std::sync::Arc;

use crate::provider::{CallbackParams, IdentityClaims, Provider};
use crate::session::SessionStore;
use crate::userdb::{User, UserError, UserStore};

use super::errors::CoordinationError;
use super::flow::{AuthFlow, AuthFlowState};

/// Drives a login from the first redirect to a signed-in session.
pub struct AuthOrchestrator {
    provider: Provider,
    users: Arc<dyn UserStore>,
}

impl AuthOrchestrator {
    pub fn new(provider: Provider, users: Arc<dyn UserStore>) -> Self {
        Self { provider, users }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Start a login. Returns the URL the browser should be redirected to.
    #[tracing::instrument(skip_all, fields(provider = %self.provider.name()))]
    pub async fn login(&self, session: &dyn SessionStore) -> Result<String, CoordinationError> {
        let mut flow = AuthFlow::starting_at(AuthFlowState::Idle);

        match self.provider.new_auth(session).await {
            Ok(url) => {
                flow.advance(AuthFlowState::AwaitingProviderRedirect);
                Ok(url)
            }
            Err(e) => {
                flow.advance(AuthFlowState::Failed);
                Err(e.into())
            }
        }
    }

    /// Handle the issuer's redirect back to us and sign the browser in.
    #[tracing::instrument(skip_all, fields(provider = %self.provider.name()))]
    pub async fn callback(
        &self,
        params: &CallbackParams,
        session: &dyn SessionStore,
    ) -> Result<User, CoordinationError> {
        let mut flow = AuthFlow::starting_at(AuthFlowState::AwaitingProviderRedirect);
        flow.advance(AuthFlowState::AwaitingCallback);

        let result = match self.provider.callback(params, session).await {
            Ok(claims) => self.login_user(&claims, session).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(_) => flow.advance(AuthFlowState::Provisioned),
            Err(_) => flow.advance(AuthFlowState::Failed),
        }
        result
    }

    /// Find or create the user for `claims`, then record the sign-in.
    ///
    /// The session is written only once a user record is known to exist.
    #[tracing::instrument(
        skip_all,
        fields(
            external_identity = %claims.external_identity(self.provider.name()),
            user_id = tracing::field::Empty
        )
    )]
    pub async fn login_user(
        &self,
        claims: &IdentityClaims,
        session: &dyn SessionStore,
    ) -> Result<User, CoordinationError> {
        let external_identity = claims.external_identity(self.provider.name());

        let existing = match self.users.find_by_external_identity(&external_identity).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed, treating as new user");
                None
            }
        };

        let mut user = match existing {
            Some(user) => user,
            None => self.create_user(&external_identity, claims).await?,
        };
        tracing::Span::current().record("user_id", user.id.as_str());

        let now = Utc::now();
        match self.users.update_last_login(&user.id, now).await {
            Ok(()) => user.last_login = now,
            Err(e) => tracing::warn!(error = %e, "Failed to update last login"),
        }

        session.set_user_id(&user.id).await?;
        tracing::info!("User signed in");
        Ok(user)
    }

    /// Name and email are taken from the first login only.
    async fn create_user(
        &self,
        external_identity: &str,
        claims: &IdentityClaims,
    ) -> Result<User, CoordinationError> {
        let mut user = User::new(external_identity.to_string(), claims.display_name.clone());
        user.email = claims.email.clone();

        match self.users.create(user.clone()).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "Created new user");
                Ok(user)
            }
            Err(UserError::Duplicate(_)) => {
                // Another login for the same identity won the insert.
                tracing::info!("User created concurrently, re-reading");
                match self.users.find_by_external_identity(external_identity).await {
                    Ok(Some(user)) => Ok(user),
                    Ok(None) => Err(CoordinationError::Provisioning(UserError::NotFound).log()),
                    Err(e) => Err(CoordinationError::Provisioning(e).log()),
                }
            }
            Err(e) => Err(CoordinationError::Provisioning(e).log()),
        }
    }

    /// The user this session is signed in as, if any.
    pub async fn current_user(
        &self,
        session: &dyn SessionStore,
    ) -> Result<Option<User>, CoordinationError> {
        let Some(user_id) = session.user_id().await? else {
            return Ok(None);
        };
        let user = self.users.get_user(&user_id).await?;
        if user.is_none() {
            tracing::debug!(user_id = %user_id, "Session names a user that no longer exists");
        }
        Ok(user)
    }

    pub async fn logout(&self, session: &dyn SessionStore) -> Result<(), CoordinationError> {
        session.clear_user_id().await?;
        tracing::debug!("Session user cleared");
        Ok(())
    }
}
