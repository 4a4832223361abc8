pub mod actions;
pub mod memory;
pub mod models;
pub mod store;

pub use memory::InMemoryConversationStore;
pub use actions::*;
pub use models::*;
pub use store::{ConversationStore, PostgresConversationStore};
