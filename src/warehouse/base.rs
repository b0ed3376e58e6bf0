use std::future::Future;

use serde_json::Value;

use crate::error::SluiceResult;
use crate::types::FieldSchema;

/// Trait for analytical stores that can receive ingested rows.
///
/// [`Warehouse`] implementations define the three remote operations the ingest protocol
/// is built on. All shared state lives behind this trait; the coordinator itself is
/// memoryless across attempts.
///
/// Implementations must honor the insert idempotency key: repeated inserts bearing the
/// same key into the same table are a no-op duplicate, not a double row. Table creation
/// must be create-if-absent, tolerating an "already exists" outcome as success, since two
/// concurrent handlers may race on the same missing table.
pub trait Warehouse {
    /// Returns the name of the warehouse.
    fn name() -> &'static str;

    /// Inserts one row into `dataset_id.table_id`, tagged with the idempotency key when
    /// provided.
    ///
    /// A missing target table surfaces as
    /// [`crate::error::ErrorKind::DestinationTableMissing`]; it is the expected trigger
    /// for the create-then-retry path, not a genuine failure.
    fn insert_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row: &Value,
        insert_id: Option<&str>,
    ) -> impl Future<Output = SluiceResult<()>> + Send;

    /// Checks whether `dataset_id.table_id` exists.
    fn table_exists(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> impl Future<Output = SluiceResult<bool>> + Send;

    /// Creates `dataset_id.table_id` with the given columns if it does not already exist.
    fn create_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        fields: &[FieldSchema],
    ) -> impl Future<Output = SluiceResult<()>> + Send;
}
