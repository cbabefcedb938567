//! HTTP handlers for agrigate-api.

pub mod chat;
pub mod health;

pub use chat::{chat, delete_history, get_history, upload_image};
pub use health::health_check;
