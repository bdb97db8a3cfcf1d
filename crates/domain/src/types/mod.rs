//! Domain types and models

pub mod ack;
pub mod outcome;
pub mod payload;
pub mod record;
pub mod submission;

pub use ack::{RegistrationReceipt, RemotePendingPayment, ServerAck, VerificationReceipt};
pub use outcome::{DrainReport, PaymentGate, QueueReason, SubmitOutcome, SyncOutcome};
pub use payload::{canonical_text, Attachment, Payload, PayloadValue};
pub use record::RecordKind;
pub use submission::{truncate_error, DedupKey, EnqueueReceipt, PendingSubmission};
