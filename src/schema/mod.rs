//! Schema inference for arbitrary JSON records.
//!
//! Turns untyped, arbitrarily nested JSON into a deterministic columnar schema plus a
//! schema-conformant value tree, and derives content-addressed table identity from the
//! inferred schema.

mod discover;
mod identity;
mod normalize;

pub use discover::*;
pub use identity::*;
pub use normalize::*;
