//! Google Gemini inference backend.
//!
//! One [`GeminiBackend`] serves both capabilities the gateway needs:
//! multi-turn chat ([`agrigate_core::ChatBackend`]) and one-shot image
//! analysis ([`agrigate_core::VisionBackend`]), each against its own model.
//!
//! # Example
//!
//! ```rust,no_run
//! use agrigate_inference::gemini::{GeminiBackend, GeminiConfig};
//! use agrigate_core::{ChatBackend, ChatTurn, GenerationConfig, SafetySetting};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiBackend::new(GeminiConfig {
//!         api_key: "AIza...".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let turn = ChatTurn::user("When should I plant cassava?", None);
//!     let reply = backend
//!         .generate_reply(&[], &turn, &GenerationConfig::chat(), &SafetySetting::chat_defaults())
//!         .await
//!         .unwrap();
//!     println!("{}", reply);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{GeminiBackend, GeminiConfig};
pub use error::{from_status, from_transport};
pub use types::*;
