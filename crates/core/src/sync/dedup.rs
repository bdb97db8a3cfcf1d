//! Dedup key derivation
//!
//! A dedup key names the real-world intent behind a submission so repeated
//! attempts collapse into one queue entry. Keys depend only on fields captured
//! when the record was created: never on wall-clock time at check time and
//! never on field order.
//!
//! | Kind            | Natural key                                              |
//! |-----------------|----------------------------------------------------------|
//! | Payment         | checkout request id, else animal id + action + timestamp |
//! | Verification    | owner id + four side-image timestamps                    |
//! | Registration    | owner phone + four side-image timestamps                 |
//! | OwnershipChange | animal id + new owner id + timestamp                     |
//! | Slaughter       | animal id + timestamp                                    |

use herdsync_domain::{DedupKey, HerdSyncError, Payload, RecordKind, Result};

/// Field names accepted for one key component, camelCase first.
type Aliases = &'static [&'static str];

const ANIMAL_ID: Aliases = &["animalId", "animal_id"];
const ACTION_TYPE: Aliases = &["actionType", "action_type"];
const TIMESTAMP: Aliases = &["timestamp"];
const CHECKOUT_ID: Aliases = &["checkoutRequestId", "checkout_request_id"];
const OWNER_ID: Aliases = &["ownerId", "owner_id"];
const OWNER_PHONE: Aliases = &["ownerPhone", "owner_phone"];
const NEW_OWNER_ID: Aliases = &["newOwnerId", "new_owner_id"];
const SIDE_TIMESTAMPS: [Aliases; 4] = [
    &["timestamp_front", "timestampFront"],
    &["timestamp_back", "timestampBack"],
    &["timestamp_left", "timestampLeft"],
    &["timestamp_right", "timestampRight"],
];

/// Derive the dedup key for `payload` as a `kind` submission.
///
/// # Errors
/// Returns `InvalidPayload` naming every missing key field.
pub fn derive_dedup_key(kind: RecordKind, payload: &Payload) -> Result<DedupKey> {
    if kind == RecordKind::Payment {
        if let Some(checkout) = payload.text(CHECKOUT_ID) {
            return Ok(hash_components(kind, "checkout", &[checkout]));
        }
    }

    let components = collect(kind, payload, &natural_key_fields(kind))?;
    Ok(hash_components(kind, "natural", &components))
}

/// Identifier of the entity a submission mutates, used for pending-state
/// gating.
pub fn entity_id(kind: RecordKind, payload: &Payload) -> Option<String> {
    payload.text(entity_field(kind))
}

pub(crate) fn entity_field(kind: RecordKind) -> Aliases {
    match kind {
        RecordKind::Payment | RecordKind::OwnershipChange | RecordKind::Slaughter => ANIMAL_ID,
        RecordKind::Verification => OWNER_ID,
        RecordKind::Registration => OWNER_PHONE,
    }
}

pub(crate) fn action_type(payload: &Payload) -> Option<String> {
    payload.text(ACTION_TYPE)
}

fn natural_key_fields(kind: RecordKind) -> Vec<Aliases> {
    match kind {
        RecordKind::Payment => vec![ANIMAL_ID, ACTION_TYPE, TIMESTAMP],
        RecordKind::Verification => with_side_timestamps(OWNER_ID),
        RecordKind::Registration => with_side_timestamps(OWNER_PHONE),
        RecordKind::OwnershipChange => vec![ANIMAL_ID, NEW_OWNER_ID, TIMESTAMP],
        RecordKind::Slaughter => vec![ANIMAL_ID, TIMESTAMP],
    }
}

fn with_side_timestamps(first: Aliases) -> Vec<Aliases> {
    std::iter::once(first).chain(SIDE_TIMESTAMPS).collect()
}

fn collect(kind: RecordKind, payload: &Payload, fields: &[Aliases]) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(fields.len());
    let mut missing = Vec::new();

    for aliases in fields {
        match payload.text(aliases) {
            Some(value) => values.push(value),
            None => missing.push(aliases.first().copied().unwrap_or_default()),
        }
    }

    if missing.is_empty() {
        Ok(values)
    } else {
        Err(HerdSyncError::InvalidPayload(format!(
            "{kind} payload is missing {}",
            missing.join(", ")
        )))
    }
}

fn hash_components(kind: RecordKind, scheme: &str, components: &[String]) -> DedupKey {
    let mut hasher = blake3::Hasher::new();
    for part in std::iter::once(kind.as_str()).chain(std::iter::once(scheme)) {
        update_framed(&mut hasher, part);
    }
    for component in components {
        update_framed(&mut hasher, component);
    }

    DedupKey::new(format!("{kind}:{}", hex::encode(hasher.finalize().as_bytes())))
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn update_framed(hasher: &mut blake3::Hasher, part: &str) {
    let len = u64::try_from(part.len()).unwrap_or(u64::MAX);
    hasher.update(&len.to_le_bytes());
    hasher.update(part.as_bytes());
}
