pub mod clients;
pub mod config;
pub mod error;
pub mod handler;
pub mod ingest;
mod macros;
pub mod schema;
pub mod types;
pub mod warehouse;
