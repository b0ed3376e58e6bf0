//! Inbound message shapes consumed by the handler boundary.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// One message as delivered by the external queue.
///
/// The payload is a base64-encoded UTF-8 JSON document. Routing metadata travels in the
/// message attributes; see [`QueueMessage::DATASET_ID_ATTRIBUTE`] and
/// [`QueueMessage::TABLE_PREFIX_ATTRIBUTE`].
#[derive(Debug, Clone, Deserialize)]
pub struct QueueMessage {
    /// Base64-encoded UTF-8 JSON payload.
    pub data: String,
    /// Routing attributes attached by the publisher.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    /// Attribute carrying the target dataset id.
    pub const DATASET_ID_ATTRIBUTE: &'static str = "datasetId";
    /// Attribute carrying the logical table prefix.
    pub const TABLE_PREFIX_ATTRIBUTE: &'static str = "tablePrefix";
}

/// Delivery metadata supplied by the queue runtime alongside each message.
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    /// Delivery-unique id, used as the insert idempotency key.
    pub event_id: String,
    /// Instant at which the event was published.
    pub timestamp: DateTime<Utc>,
}
