//! Request middleware and extractors.

pub mod auth;
pub mod rate_limit;

pub use auth::{RequireAuth, StaticTokenVerifier};
pub use rate_limit::rate_limit_middleware;
