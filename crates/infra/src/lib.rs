//! # HerdSync Infrastructure
//!
//! Infrastructure implementations of the core sync ports.
//!
//! This crate contains:
//! - SQLite queue store behind an r2d2 pool
//! - HTTP submission client and connectivity probe
//! - Background sync worker
//! - Config loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `herdsync-core`
//! - Contains all "impure" code (I/O, sockets, clocks)

pub mod config;
pub mod connectivity;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod submission;
pub mod sync;

pub use connectivity::{ConnectivityState, HttpProbeConnectivity};
pub use database::{DbManager, SqliteQueueStore};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use submission::{HttpSubmissionClient, SubmissionClientConfig};
pub use sync::{SyncWorker, SyncWorkerConfig, WorkerError};
