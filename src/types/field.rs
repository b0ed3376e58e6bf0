//! Column descriptors for tables inferred from record shapes.

use serde::Serialize;

/// Cardinality of a column.
///
/// A [`FieldMode::Repeated`] field describes the *element* shape of an ordered sequence;
/// repeated-of-repeated is rejected during normalization, so the mode never nests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Required,
    Repeated,
}

/// Data type of a column.
///
/// Numbers are always inferred as [`FieldType::Float`]; there is no integer/float
/// distinction on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Boolean,
    Float,
    Timestamp,
    Record,
}

/// Describes one column of an inferred table.
///
/// A [`FieldType::Record`] field carries its nested columns in `fields`, sorted ascending
/// by name with unique names; for every other type `fields` is empty. The `Serialize`
/// implementation emits struct fields in declaration order, so together with the sorted
/// nested fields `serde_json::to_vec` yields a canonical serialization of the schema tree,
/// which the identity resolver hashes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    pub mode: FieldMode,
    #[serde(rename = "type")]
    pub typ: FieldType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    /// Creates a required, non-nested field of the given type.
    pub fn new(name: impl Into<String>, typ: FieldType) -> Self {
        Self {
            name: name.into(),
            mode: FieldMode::Required,
            typ,
            fields: Vec::new(),
        }
    }

    /// Creates a required record field with the given nested columns.
    ///
    /// Callers must pass the nested fields already sorted by name.
    pub fn record(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            mode: FieldMode::Required,
            typ: FieldType::Record,
            fields,
        }
    }

    /// Returns true when the field describes an ordered sequence.
    pub fn is_repeated(&self) -> bool {
        self.mode == FieldMode::Repeated
    }
}
