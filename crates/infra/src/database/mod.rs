//! Database implementations

pub mod manager;
pub mod queue_repository;

pub use manager::*;
pub use queue_repository::*;
