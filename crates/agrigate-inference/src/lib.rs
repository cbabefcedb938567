//! # agrigate-inference
//!
//! AI provider integration for the agrigate gateway.
//!
//! This crate provides:
//! - Gemini REST backend implementing both chat and vision traits
//! - Vision analyzer with bounded retry on transient failures
//! - Chat session manager with serialized, commit-on-success sends
//! - Scripted mock backend for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Expose [`mock::MockBackend`] to other crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agrigate_inference::{GeminiBackend, SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(GeminiBackend::from_env().unwrap());
//!     let sessions = SessionManager::new(backend, SessionConfig::default());
//!     let reply = sessions.send("farmer-1", "Is it too late to sow maize?", None).await;
//!     println!("{:?}", reply);
//! }
//! ```

pub mod gemini;
pub mod session;
pub mod vision;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use session::{ChatSession, SessionConfig, SessionManager};
pub use vision::{RetryPolicy, VisionAnalyzer};
