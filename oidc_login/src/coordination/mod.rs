//! Login coordination
//!
//! [`AuthOrchestrator`] ties a [`Provider`](crate::provider::Provider) to a
//! [`UserStore`](crate::userdb::UserStore) and a
//! [`SessionStore`](crate::session::SessionStore). It is the only part of the
//! crate an HTTP layer needs to call.

mod errors;
mod flow;
mod orchestrator;

pub use errors::CoordinationError;
pub use flow::AuthFlowState;
pub use orchestrator::AuthOrchestrator;
