//! Queue-facing message boundary.
//!
//! Translates one queue delivery into an ingest attempt and maps the outcome onto
//! queue-level accept/retry/drop behavior. The handler never returns an error: whether a
//! failed delivery is retried or dropped has different redelivery consequences in the
//! surrounding queue runtime and must be chosen deliberately, so every failure is caught,
//! logged, and folded into the returned [`HandlerOutcome`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::HandlerConfig;
use crate::error::{ErrorKind, SluiceResult};
use crate::ingest::{IngestOutcome, Ingestor};
use crate::sluice_error;
use crate::types::{DeliveryContext, QueueMessage};
use crate::warehouse::Warehouse;

/// What the surrounding queue harness should do with a delivery.
///
/// The harness owns ack/nack and redelivery timing; the handler only signals intent. A
/// deliberate delay (instead of an in-process stall) is requested when the target table
/// was just created and is not yet ready for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The delivery is finished and should be acked.
    ///
    /// Covers successful inserts as well as dropped deliveries (stale, undecodable, or
    /// failed), which are logged and never retried.
    Completed,
    /// Redeliver the message after the given delay.
    RetryAfter(Duration),
}

/// Handles queue deliveries by decoding them and driving the ingest coordinator.
pub struct MessageHandler<W> {
    ingestor: Ingestor<W>,
    config: HandlerConfig,
}

impl<W: Warehouse> MessageHandler<W> {
    /// Creates a handler around a long-lived warehouse handle.
    pub fn new(warehouse: W, config: HandlerConfig) -> Self {
        Self {
            ingestor: Ingestor::new(warehouse),
            config,
        }
    }

    /// Processes one delivery.
    ///
    /// Stale deliveries are dropped before any decoding or warehouse call. The queue's
    /// delivery-unique id doubles as the insert idempotency key, which is what makes
    /// redelivery-driven retries safe.
    pub async fn handle(
        &self,
        message: &QueueMessage,
        context: &DeliveryContext,
    ) -> HandlerOutcome {
        let age = Utc::now().signed_duration_since(context.timestamp);
        if age > self.config.staleness_threshold() {
            warn!(
                "dropping stale event {} of age {}s",
                context.event_id,
                age.num_seconds()
            );

            return HandlerOutcome::Completed;
        }

        let (dataset_id, table_prefix, data) = match decode_message(message) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!("dropping undecodable event {}: {err}", context.event_id);

                return HandlerOutcome::Completed;
            }
        };

        match self
            .ingestor
            .ingest(&dataset_id, &table_prefix, &data, Some(&context.event_id))
            .await
        {
            Ok(IngestOutcome::Inserted) => HandlerOutcome::Completed,
            Ok(IngestOutcome::TableCreatedNotReady) => {
                info!(
                    "table for event {} not ready, requesting redelivery in {}s",
                    context.event_id, self.config.retry_delay_secs
                );

                HandlerOutcome::RetryAfter(self.config.retry_delay())
            }
            Err(err) => {
                error!(
                    "aborting event {} for {dataset_id}.{table_prefix}: {err}",
                    context.event_id
                );

                HandlerOutcome::Completed
            }
        }
    }
}

/// Extracts the routing attributes and decodes the payload of one message.
fn decode_message(message: &QueueMessage) -> SluiceResult<(String, String, Value)> {
    let dataset_id = message
        .attributes
        .get(QueueMessage::DATASET_ID_ATTRIBUTE)
        .cloned()
        .ok_or_else(|| {
            sluice_error!(
                ErrorKind::MissingAttribute,
                "Message is missing the datasetId attribute"
            )
        })?;
    let table_prefix = message
        .attributes
        .get(QueueMessage::TABLE_PREFIX_ATTRIBUTE)
        .cloned()
        .ok_or_else(|| {
            sluice_error!(
                ErrorKind::MissingAttribute,
                "Message is missing the tablePrefix attribute"
            )
        })?;

    let payload = STANDARD.decode(&message.data)?;
    let payload = String::from_utf8(payload)?;
    let data = serde_json::from_str(&payload)?;

    Ok((dataset_id, table_prefix, data))
}
