//! Handles used to talk to the actors.

pub mod macros;
pub mod conversation_client;
pub mod store_client;

pub use conversation_client::ConversationClient;
pub use store_client::StoreClient;
