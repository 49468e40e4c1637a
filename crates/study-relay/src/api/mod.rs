//! API module - HTTP handlers for chat relay and study scheduling

pub mod admin_api;
pub mod chat_api;
pub mod schedule_api;
pub mod stream_api;

// Re-export API handlers
pub use admin_api::status;
pub use chat_api::{chat, ChatResponse, ErrorResponse};
pub use schedule_api::{extract, preview};
pub use stream_api::{generate_stream, StreamChatRequest};
