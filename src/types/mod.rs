//! Common types used throughout the ingestion system.
//!
//! Re-exports the inferred column schema types, wire timestamp handling, and the inbound
//! message shapes consumed by the handler boundary.

mod field;
mod message;
mod value;

pub use field::*;
pub use message::*;
pub use value::*;
