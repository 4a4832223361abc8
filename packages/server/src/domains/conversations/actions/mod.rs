mod request;
mod validate_password;

pub use request::{request_private_conversation, ConversationRequest};
pub use validate_password::validate_conversation_password;
