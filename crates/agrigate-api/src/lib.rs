//! # agrigate-api
//!
//! HTTP surface of the agrigate gateway: the chat, image upload, and
//! history endpoints, bearer authentication, and the middleware stack.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
