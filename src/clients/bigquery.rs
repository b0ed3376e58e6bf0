use std::fmt;
use std::fs;

use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::query_parameter::QueryParameter;
use gcp_bigquery_client::model::query_parameter_type::QueryParameterType;
use gcp_bigquery_client::model::query_parameter_value::QueryParameterValue;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use serde_json::Value;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, SluiceResult};
use crate::types::{FieldMode, FieldSchema, FieldType};
use crate::warehouse::Warehouse;

/// A client for interacting with Google BigQuery.
///
/// This client provides the three warehouse operations the ingest protocol is built on:
/// streaming row inserts with an idempotency key, table existence checks, and table
/// creation from inferred column schemas.
pub struct BigQueryClient {
    project_id: String,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] from a Google Cloud service account key file.
    ///
    /// Reads the service account key from the specified file path and uses it to
    /// authenticate with the BigQuery API.
    pub async fn new_with_key_path(
        project_id: String,
        sa_key_path: &str,
    ) -> SluiceResult<BigQueryClient> {
        let sa_key = fs::read_to_string(sa_key_path)?;

        Self::new_with_key(project_id, &sa_key).await
    }

    /// Creates a new [`BigQueryClient`] from a Google Cloud service account key string.
    pub async fn new_with_key(project_id: String, sa_key: &str) -> SluiceResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)?;
        let client = Client::from_service_account_key(sa_key, false).await?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Creates a new [`BigQueryClient`] from a service-account JSON key and allows
    /// overriding the BigQuery endpoint URLs.
    ///
    /// This override is intended only for integration tests and local development against
    /// BigQuery emulators or mock servers.
    pub async fn new_with_custom_urls(
        project_id: String,
        auth_base_url: String,
        v2_base_url: String,
        sa_key: &str,
    ) -> SluiceResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)?;
        let client = ClientBuilder::new()
            .with_auth_base_url(auth_base_url)
            .with_v2_base_url(v2_base_url)
            .build_from_service_account_key(sa_key, false)
            .await?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Inserts one row into a table using the streaming insert API.
    ///
    /// The optional `insert_id` rides along with the row; BigQuery uses it to
    /// best-effort deduplicate repeated inserts of the same logical row. Row-level
    /// errors returned with an otherwise successful response are surfaced as failures.
    pub async fn insert_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row: &Value,
        insert_id: Option<&str>,
    ) -> SluiceResult<()> {
        let mut request = TableDataInsertAllRequest::new();
        request.add_row(insert_id.map(str::to_string), row)?;

        let response = self
            .client
            .tabledata()
            .insert_all(&self.project_id, dataset_id, table_id, request)
            .await?;

        if let Some(insert_errors) = response.insert_errors
            && !insert_errors.is_empty()
        {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "BigQuery rejected the inserted row",
                format!("{insert_errors:?}")
            );
        }

        info!(
            "inserted row into {}.{dataset_id}.{table_id} in bigquery",
            self.project_id
        );

        Ok(())
    }

    /// Checks if a table exists in the specified dataset.
    pub async fn table_exists(&self, dataset_id: &str, table_id: &str) -> SluiceResult<bool> {
        let query = format!(
            "select exists (select 1 from `{}.{}.INFORMATION_SCHEMA.TABLES` where table_name = @table_name) as table_exists",
            self.project_id, dataset_id
        );

        let mut request = QueryRequest::new(query);
        let parameter = QueryParameter {
            name: Some("table_name".to_string()),
            parameter_type: Some(QueryParameterType {
                r#type: "string".to_string(),
                array_type: None,
                struct_types: None,
            }),
            parameter_value: Some(QueryParameterValue {
                value: Some(table_id.to_string()),
                array_values: None,
                struct_values: None,
            }),
        };
        request.query_parameters = Some(vec![parameter]);

        let mut result_set = self.query(request).await?;

        let mut exists = false;
        if result_set.next_row() {
            exists = result_set.get_bool_by_name("table_exists")?.unwrap_or(false);
        }

        Ok(exists)
    }

    /// Creates a table in a BigQuery dataset from inferred column schemas.
    ///
    /// Uses `create table if not exists`, so a concurrent creation of the same table is
    /// tolerated as success.
    pub async fn create_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        fields: &[FieldSchema],
    ) -> SluiceResult<()> {
        let columns_spec = Self::create_columns_spec(fields);
        let project_id = self.project_id.as_str();

        info!("creating table {project_id}.{dataset_id}.{table_id} in bigquery");

        let query = format!(
            "create table if not exists `{project_id}.{dataset_id}.{table_id}` {columns_spec}"
        );

        let _ = self.query(QueryRequest::new(query)).await?;

        Ok(())
    }

    /// Executes an SQL query and returns the result set.
    async fn query(&self, request: QueryRequest) -> Result<ResultSet, BQError> {
        let query_response = self.client.job().query(&self.project_id, request).await?;

        Ok(ResultSet::new_from_query_response(query_response))
    }

    /// Generates the BigQuery data type for a field, recursing into nested records.
    fn field_ddl_type(field: &FieldSchema) -> String {
        let element_type = match field.typ {
            FieldType::String => "string".to_string(),
            FieldType::Boolean => "bool".to_string(),
            FieldType::Float => "float64".to_string(),
            FieldType::Timestamp => "timestamp".to_string(),
            FieldType::Record => {
                let nested = field
                    .fields
                    .iter()
                    .map(|nested| format!("`{}` {}", nested.name, Self::field_ddl_type(nested)))
                    .collect::<Vec<_>>()
                    .join(", ");

                format!("struct<{nested}>")
            }
        };

        if field.mode == FieldMode::Repeated {
            return format!("array<{element_type}>");
        }

        element_type
    }

    /// Generates an SQL column specification for a `CREATE TABLE` statement.
    ///
    /// Arrays cannot carry a `not null` constraint in BigQuery, so only required columns
    /// get one.
    fn column_spec(field: &FieldSchema) -> String {
        let mut column_spec = format!("`{}` {}", field.name, Self::field_ddl_type(field));

        if field.mode == FieldMode::Required {
            column_spec.push_str(" not null");
        }

        column_spec
    }

    /// Creates the full column specification clause for a `CREATE TABLE` statement.
    fn create_columns_spec(fields: &[FieldSchema]) -> String {
        let spec = fields
            .iter()
            .map(Self::column_spec)
            .collect::<Vec<_>>()
            .join(",");

        format!("({spec})")
    }
}

impl Warehouse for BigQueryClient {
    fn name() -> &'static str {
        "bigquery"
    }

    async fn insert_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row: &Value,
        insert_id: Option<&str>,
    ) -> SluiceResult<()> {
        BigQueryClient::insert_row(self, dataset_id, table_id, row, insert_id).await
    }

    async fn table_exists(&self, dataset_id: &str, table_id: &str) -> SluiceResult<bool> {
        BigQueryClient::table_exists(self, dataset_id, table_id).await
    }

    async fn create_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        fields: &[FieldSchema],
    ) -> SluiceResult<()> {
        BigQueryClient::create_table(self, dataset_id, table_id, fields).await
    }
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema {
                name: "age".to_string(),
                mode: FieldMode::Repeated,
                typ: FieldType::Float,
                fields: Vec::new(),
            },
            FieldSchema::new("name", FieldType::String),
            FieldSchema::record(
                "position",
                vec![
                    FieldSchema::new("lat", FieldType::Float),
                    FieldSchema::new("lon", FieldType::Float),
                ],
            ),
        ]
    }

    #[test]
    fn columns_spec_renders_scalars_arrays_and_structs() {
        let spec = BigQueryClient::create_columns_spec(&record_fields());
        assert_eq!(
            spec,
            "(`age` array<float64>,`name` string not null,`position` struct<`lat` float64, `lon` float64> not null)"
        );
    }

    #[test]
    fn repeated_record_renders_array_of_struct() {
        let field = FieldSchema {
            name: "points".to_string(),
            mode: FieldMode::Repeated,
            typ: FieldType::Record,
            fields: vec![FieldSchema::new("x", FieldType::Float)],
        };
        assert_eq!(
            BigQueryClient::column_spec(&field),
            "`points` array<struct<`x` float64>>"
        );
    }

    #[test]
    fn timestamp_column_renders_timestamp_type() {
        let field = FieldSchema::new("at", FieldType::Timestamp);
        assert_eq!(
            BigQueryClient::column_spec(&field),
            "`at` timestamp not null"
        );
    }
}
