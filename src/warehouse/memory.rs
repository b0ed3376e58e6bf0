use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::types::FieldSchema;
use crate::warehouse::Warehouse;

/// One stored table with its schema, rows, and seen insert ids.
#[derive(Debug)]
struct StoredTable {
    fields: Vec<FieldSchema>,
    rows: Vec<Value>,
    insert_ids: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<(String, String), StoredTable>,
    injected_failures: VecDeque<SluiceError>,
    calls: usize,
}

/// In-memory warehouse for testing and development purposes.
///
/// [`MemoryWarehouse`] stores all ingested data in memory, making it ideal for testing
/// the insert-or-create protocol and the handler boundary without a remote store. It
/// dedups rows on the insert idempotency key the way the real warehouse does, and can be
/// primed with failures to exercise remote-error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWarehouse {
    /// Creates a new empty memory warehouse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error to be returned by the next insert attempt.
    pub async fn fail_next_insert(&self, error: SluiceError) {
        let mut inner = self.inner.lock().await;
        inner.injected_failures.push_back(error);
    }

    /// Returns a copy of all rows stored for the given table.
    pub async fn table_rows(&self, dataset_id: &str, table_id: &str) -> Vec<Value> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&(dataset_id.to_string(), table_id.to_string()))
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Returns the column schema the given table was created with.
    pub async fn table_fields(&self, dataset_id: &str, table_id: &str) -> Option<Vec<FieldSchema>> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&(dataset_id.to_string(), table_id.to_string()))
            .map(|table| table.fields.clone())
    }

    /// Returns the ids of all tables in the given dataset.
    pub async fn dataset_tables(&self, dataset_id: &str) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut tables: Vec<String> = inner
            .tables
            .keys()
            .filter(|(dataset, _)| dataset == dataset_id)
            .map(|(_, table)| table.clone())
            .collect();
        tables.sort();
        tables
    }

    /// Returns how many warehouse operations have been attempted.
    pub async fn call_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.calls
    }
}

impl Warehouse for MemoryWarehouse {
    fn name() -> &'static str {
        "memory"
    }

    async fn insert_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row: &Value,
        insert_id: Option<&str>,
    ) -> SluiceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls += 1;

        if let Some(error) = inner.injected_failures.pop_front() {
            return Err(error);
        }

        let key = (dataset_id.to_string(), table_id.to_string());
        let Some(table) = inner.tables.get_mut(&key) else {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Table does not exist",
                format!("{dataset_id}.{table_id}")
            );
        };

        if let Some(insert_id) = insert_id
            && !table.insert_ids.insert(insert_id.to_string())
        {
            // Duplicate delivery; the row is already stored.
            return Ok(());
        }

        table.rows.push(row.clone());

        Ok(())
    }

    async fn table_exists(&self, dataset_id: &str, table_id: &str) -> SluiceResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.calls += 1;

        let key = (dataset_id.to_string(), table_id.to_string());

        Ok(inner.tables.contains_key(&key))
    }

    async fn create_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        fields: &[FieldSchema],
    ) -> SluiceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls += 1;

        let key = (dataset_id.to_string(), table_id.to_string());
        if inner.tables.contains_key(&key) {
            // Create-if-absent; an existing table is success.
            return Ok(());
        }

        info!("creating table {dataset_id}.{table_id} in memory");

        inner.tables.insert(
            key,
            StoredTable {
                fields: fields.to_vec(),
                rows: Vec::new(),
                insert_ids: HashSet::new(),
            },
        );

        Ok(())
    }
}
