//! Remote submission adapters.

pub mod client;

pub use client::{HttpSubmissionClient, SubmissionClientConfig};
