use std::fmt;

/// Where one login attempt stands.
///
/// ```text
/// Idle -> AwaitingProviderRedirect -> AwaitingCallback -> Provisioned | Failed
/// ```
///
/// The attempt spans two requests, so no single value lives through all of
/// it. Each request starts from the state it can infer and logs every move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlowState {
    Idle,
    AwaitingProviderRedirect,
    AwaitingCallback,
    Provisioned,
    Failed,
}

impl AuthFlowState {
    pub fn can_transition_to(self, next: AuthFlowState) -> bool {
        use AuthFlowState::*;
        matches!(
            (self, next),
            (Idle, AwaitingProviderRedirect)
                | (AwaitingProviderRedirect, AwaitingCallback)
                | (AwaitingCallback, Provisioned)
                | (Idle | AwaitingProviderRedirect | AwaitingCallback, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AuthFlowState::Provisioned | AuthFlowState::Failed)
    }
}

impl fmt::Display for AuthFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingProviderRedirect => "awaiting_provider_redirect",
            Self::AwaitingCallback => "awaiting_callback",
            Self::Provisioned => "provisioned",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Request-scoped tracker that logs each state change.
#[derive(Debug)]
pub(super) struct AuthFlow {
    state: AuthFlowState,
}

impl AuthFlow {
    pub(super) fn starting_at(state: AuthFlowState) -> Self {
        tracing::debug!(state = %state, "Login flow entered");
        Self { state }
    }

    #[cfg(test)]
    pub(super) fn state(&self) -> AuthFlowState {
        self.state
    }

    pub(super) fn advance(&mut self, next: AuthFlowState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Unexpected login flow transition");
        }
        match next {
            AuthFlowState::Failed => tracing::info!(from = %self.state, "Login flow failed"),
            AuthFlowState::Provisioned => tracing::info!(from = %self.state, "Login flow completed"),
            _ => tracing::debug!(from = %self.state, to = %next, "Login flow advanced"),
        }
        self.state = next;
    }
}
