//! Local user records and the store collaborator that persists them

mod config;
mod errors;
mod memory;
mod postgres;
mod sqlite;
mod types;

pub use errors::UserError;
pub use memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;
pub use sqlite::SqliteUserStore;
pub use types::{User, UserStore};
