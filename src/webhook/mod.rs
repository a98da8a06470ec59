mod payload;
mod signature;

pub use payload::{parse_event, EventDisposition};
pub use signature::{sign_body, verify_signature};

/// Header carrying the HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Header naming the event type ("push", "ping", ...).
pub const EVENT_HEADER: &str = "x-github-event";
/// Header carrying the provider's unique delivery id.
pub const DELIVERY_HEADER: &str = "x-github-delivery";
