//! Payload fixtures shaped like the field app's requests.

use herdsync_domain::{Attachment, Payload, RecordKind, ServerAck};
use serde_json::json;

pub const PAYMENT_TS: &str = "2024-01-01T00:00:00Z";

pub fn payment(animal_id: &str) -> Payload {
    payment_at(animal_id, PAYMENT_TS)
}

pub fn payment_at(animal_id: &str, timestamp: &str) -> Payload {
    Payload::new()
        .with_field("animalId", animal_id)
        .with_field("actionType", "ownership")
        .with_field("amount", 500)
        .with_field("phone", "254700000000")
        .with_field("timestamp", timestamp)
}

pub fn slaughter(animal_id: &str) -> Payload {
    Payload::new()
        .with_field("animalId", animal_id)
        .with_field("slaughterDate", "2024-02-10")
        .with_field("slaughterLocation", "Kiambu")
        .with_field("remarks", "")
        .with_field("timestamp", "2024-02-10T09:30:00Z")
}

pub fn verification(owner_id: &str) -> Payload {
    let mut payload = Payload::new().with_field("owner_id", owner_id);
    for (offset, side) in ["front", "back", "left", "right"].iter().enumerate() {
        payload.insert_field(format!("timestamp_{side}"), format!("17000000{offset:02}"));
        payload.insert_attachment(format!("image_{side}"), Attachment::jpeg(side, vec![0xff, 0xd8]));
    }
    payload
}

pub fn ack(kind: RecordKind) -> ServerAck {
    ServerAck::new(kind, 200, json!({ "success": true }))
}
