use std::collections::HashMap;
use std::sync::Arc;

use oidc_login::{AuthOrchestrator, CoordinationError, Provider, SessionStore, User, UserStore};

use super::session::SessionRegistry;

/// Shared state behind the login routes
///
/// Every configured provider gets its own orchestrator, all of them backed by
/// the same user store.
#[derive(Clone)]
pub struct OidcLoginState {
    users: Arc<dyn UserStore>,
    orchestrators: Arc<HashMap<String, Arc<AuthOrchestrator>>>,
    sessions: SessionRegistry,
}

impl OidcLoginState {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            orchestrators: Arc::new(HashMap::new()),
            sessions: SessionRegistry::new(),
        }
    }

    /// Replace the session registry, for example to change the session lifetime.
    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    /// Mount `provider` under `/{name}/login` and `/{name}/callback`.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        let name = provider.name().to_string();
        let orchestrator = AuthOrchestrator::new(provider, self.users.clone());

        let mut orchestrators = (*self.orchestrators).clone();
        if orchestrators
            .insert(name.clone(), Arc::new(orchestrator))
            .is_some()
        {
            tracing::warn!(provider = %name, "Provider registered twice, keeping the last one");
        }
        self.orchestrators = Arc::new(orchestrators);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.orchestrators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn orchestrator(&self, name: &str) -> Option<Arc<AuthOrchestrator>> {
        self.orchestrators.get(name).cloned()
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Resolve the signed-in user through any orchestrator; they share one store.
    pub(crate) async fn current_user(
        &self,
        session: &dyn SessionStore,
    ) -> Result<Option<User>, CoordinationError> {
        match self.orchestrators.values().next() {
            Some(orchestrator) => orchestrator.current_user(session).await,
            None => Ok(None),
        }
    }

    pub(crate) async fn logout(&self, session: &dyn SessionStore) -> Result<(), CoordinationError> {
        match self.orchestrators.values().next() {
            Some(orchestrator) => orchestrator.logout(session).await,
            None => Ok(session.clear_user_id().await?),
        }
    }
}
