//! Ingest coordination: the idempotent insert-or-create protocol.
//!
//! One [`Ingestor::ingest`] call covers exactly one delivery attempt of one record. The
//! coordinator keeps no state across attempts; retry after a table creation is entirely
//! delegated to the queue's redelivery mechanism.

use serde_json::Value;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, SluiceResult};
use crate::schema::{discover, is_safe_identifier, resolve_table_id};
use crate::warehouse::Warehouse;

/// Result of one ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The row was accepted by the warehouse.
    Inserted,
    /// The target table was missing and has just been created.
    ///
    /// The row was not written on this attempt: the freshly created table may not yet be
    /// consistent for immediate writes, and redelivery of the same record will hit a
    /// schema-matched table by construction.
    TableCreatedNotReady,
}

/// Orchestrates schema discovery, table identity resolution, and the insert-or-create
/// protocol against an injected warehouse handle.
///
/// The warehouse handle is expected to be long-lived and shared across messages; the
/// coordinator itself owns no other state.
#[derive(Debug, Clone)]
pub struct Ingestor<W> {
    warehouse: W,
}

impl<W: Warehouse> Ingestor<W> {
    /// Creates a new coordinator around the given warehouse handle.
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }

    /// Returns the underlying warehouse handle.
    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Ingests one record into a table derived from its inferred schema.
    ///
    /// `insert_id` is the caller's idempotency key; redelivered attempts carrying the
    /// same key never produce duplicate rows. On a missing target table the table is
    /// created (tolerating a concurrent creation) and
    /// [`IngestOutcome::TableCreatedNotReady`] is returned without writing the row. Any
    /// other warehouse failure propagates unchanged.
    pub async fn ingest(
        &self,
        dataset_id: &str,
        table_prefix: &str,
        data: &Value,
        insert_id: Option<&str>,
    ) -> SluiceResult<IngestOutcome> {
        if !is_safe_identifier(dataset_id) {
            bail!(
                ErrorKind::InvalidIdentifier,
                "Dataset ids may only contain letters, digits and underscores",
                dataset_id.to_string()
            );
        }
        if !is_safe_identifier(table_prefix) {
            bail!(
                ErrorKind::InvalidIdentifier,
                "Table prefixes may only contain letters, digits and underscores",
                table_prefix.to_string()
            );
        }

        let (fields, row) = discover(data)?;
        let table_id = resolve_table_id(table_prefix, &fields)?;

        match self
            .warehouse
            .insert_row(dataset_id, &table_id, &row, insert_id)
            .await
        {
            Ok(()) => {
                info!("inserted row into {dataset_id}.{table_id}");

                Ok(IngestOutcome::Inserted)
            }
            Err(err) if err.kind() == ErrorKind::DestinationTableMissing => {
                // Another handler may have created the table between the identity
                // resolution and the insert attempt.
                if !self.warehouse.table_exists(dataset_id, &table_id).await? {
                    self.warehouse
                        .create_table(dataset_id, &table_id, &fields)
                        .await?;

                    info!("created table {dataset_id}.{table_id}");
                }

                Ok(IngestOutcome::TableCreatedNotReady)
            }
            Err(err) => Err(err),
        }
    }
}
