//! Browser session collaborator
//!
//! The engine never touches cookies or session encoding. It only needs to
//! park a [`PendingAuth`] between the login redirect and the callback, and to
//! record which user a browser is signed in as. [`SessionStore`] is that
//! narrow surface; cookie handling lives behind it.

mod errors;
mod memory;
mod types;

pub use errors::SessionError;
pub use memory::MemorySession;
pub use types::{PendingAuth, SessionStore};
