//! Shared test helpers for `herdsync-core` integration tests.
//!
//! In-memory port mocks and payload fixtures so the coordinator and
//! pending-state tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
