//! Whole-record schema discovery.

use serde_json::Value;

use crate::bail;
use crate::error::{ErrorKind, SluiceResult};
use crate::schema::normalize;
use crate::types::{FieldMode, FieldSchema, FieldType};

/// Synthetic field name under which the root value is normalized.
const ROOT_FIELD_NAME: &str = "root";

/// Discovers the table schema of a whole record and normalizes the record to match.
///
/// The root value must normalize to a non-empty, non-repeated record; scalars and arrays
/// at the top level are invalid data. Normalization failures inside the root propagate
/// as-is, while a root of the wrong shape fails with the raw input attached for
/// diagnostics.
pub fn discover(value: &Value) -> SluiceResult<(Vec<FieldSchema>, Value)> {
    let (schema, normalized) = normalize(ROOT_FIELD_NAME, value)?;

    if schema.typ != FieldType::Record || schema.mode != FieldMode::Required {
        bail!(
            ErrorKind::InvalidData,
            "Top-level values must be JSON objects",
            detail = value.to_string()
        );
    }

    Ok((schema.fields, normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discover_returns_root_fields_and_value() {
        let input = json!({"name": "Tom", "age": [30, 21, 33]});
        let (fields, value) = discover(&input).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "age");
        assert_eq!(fields[1].name, "name");
        assert_eq!(value, json!({"age": [30, 21, 33], "name": "Tom"}));
    }

    #[test]
    fn discover_rejects_scalar_root() {
        let err = discover(&json!("just a string")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.detail().unwrap().contains("just a string"));
    }

    #[test]
    fn discover_rejects_array_root() {
        let err = discover(&json!([{"a": 1}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn discover_rejects_empty_root() {
        let err = discover(&json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);
    }

    #[test]
    fn discover_rejects_null_root() {
        let err = discover(&Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }
}
