//! Record kinds handled by the offline engine.

use serde::{Deserialize, Serialize};

use crate::constants::{
    OWNERSHIP_CHANGE_PATH, OWNERSHIP_QUEUE, PAYMENT_PROCESS_PATH, PAYMENT_QUEUE, REGISTER_PATH,
    REGISTRATION_QUEUE, SLAUGHTER_PATH, SLAUGHTER_QUEUE, VERIFICATION_QUEUE, VERIFY_PATH,
};
use crate::impl_label_conversions;

/// Category of mutating action. Determines endpoint, dedup-key shape and the
/// persisted collection an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Registration,
    Verification,
    Payment,
    OwnershipChange,
    Slaughter,
}

impl_label_conversions!(RecordKind {
    Registration => "registration",
    Verification => "verification",
    Payment => "payment",
    OwnershipChange => "ownership_change",
    Slaughter => "slaughter",
});

impl RecordKind {
    /// Number of kinds.
    pub const COUNT: usize = 5;

    /// Every kind, in the order drains are started.
    pub const ALL: [RecordKind; Self::COUNT] = [
        RecordKind::Registration,
        RecordKind::Verification,
        RecordKind::Payment,
        RecordKind::OwnershipChange,
        RecordKind::Slaughter,
    ];

    /// Name of the persisted collection holding this kind's queue.
    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::Registration => REGISTRATION_QUEUE,
            Self::Verification => VERIFICATION_QUEUE,
            Self::Payment => PAYMENT_QUEUE,
            Self::OwnershipChange => OWNERSHIP_QUEUE,
            Self::Slaughter => SLAUGHTER_QUEUE,
        }
    }

    /// Remote path the kind is submitted to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Registration => REGISTER_PATH,
            Self::Verification => VERIFY_PATH,
            Self::Payment => PAYMENT_PROCESS_PATH,
            Self::OwnershipChange => OWNERSHIP_CHANGE_PATH,
            Self::Slaughter => SLAUGHTER_PATH,
        }
    }

    /// Dense index into per-kind tables.
    pub fn index(&self) -> usize {
        match self {
            Self::Registration => 0,
            Self::Verification => 1,
            Self::Payment => 2,
            Self::OwnershipChange => 3,
            Self::Slaughter => 4,
        }
    }
}
