//! # agrigate-core
//!
//! Core types, traits, and request-handling primitives for the agrigate
//! conversational AI gateway.
//!
//! This crate provides the domain model, the error taxonomy and its
//! normalizer, multi-modal input validation, message composition, and the
//! sliding-window upstream budget that the other agrigate crates depend on.

pub mod compose;
pub mod defaults;
pub mod error;
pub mod image_input;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod rate_limit;
pub mod traits;

// Re-export commonly used types at crate root
pub use compose::compose;
pub use error::{Error, ErrorKind, Result, TransportFailure, UpstreamError};
pub use image_input::{decoded_size, validate_image_ref, validate_upload};
pub use models::*;
pub use normalize::normalize;
pub use rate_limit::{BudgetConfig, Scope, SlidingWindow, UpstreamBudget};
pub use traits::*;
