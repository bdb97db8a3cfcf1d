//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

// Persisted collection names, one per record kind
pub const REGISTRATION_QUEUE: &str = "offlineRegistrationQueue";
pub const VERIFICATION_QUEUE: &str = "offlineVerificationQueue";
pub const PAYMENT_QUEUE: &str = "offlinePaymentQueue";
pub const OWNERSHIP_QUEUE: &str = "offlineOwnershipQueue";
pub const SLAUGHTER_QUEUE: &str = "offlineSlaughterQueue";

// Remote endpoints
pub const REGISTER_PATH: &str = "/register";
pub const VERIFY_PATH: &str = "/verify";
pub const PAYMENT_PROCESS_PATH: &str = "/payment/process";
pub const PAYMENT_PENDING_PATH: &str = "/payment/pending";
pub const OWNERSHIP_CHANGE_PATH: &str = "/ownership/change";
pub const SLAUGHTER_PATH: &str = "/slaughter";

/// Image sides captured for registration and verification.
pub const IMAGE_SIDES: [&str; 4] = ["front", "back", "left", "right"];

pub const MAX_ERROR_LENGTH: usize = 256;
pub const ERROR_TRUNCATE_SUFFIX: &str = "...";

// Network defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
