//! Persistence layer — conversation state behind the `StateStore` trait.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod state;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use state::{CONVERSATION_PROPERTY, load_conversation, save_conversation};
pub use traits::StateStore;
