//! Warehouse clients.

#[cfg(feature = "bigquery")]
pub mod bigquery;
