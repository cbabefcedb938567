//! Service layer for business logic.

pub mod gateway;
pub mod history;

pub use gateway::{ChatRequest, Gateway, GatewayConfig};
pub use history::InMemoryHistoryStore;
