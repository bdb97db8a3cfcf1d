//! # HerdSync Domain
//!
//! Business domain types and models for HerdSync.
//!
//! This crate contains:
//! - Record kinds, payloads, and pending submissions
//! - Server acknowledgements and sync outcomes
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other HerdSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
