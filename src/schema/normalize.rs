//! Type normalization: infers a field schema from a JSON value and rewrites the value to
//! conform to it.
//!
//! Normalization is a pure function over the value tree; it performs no I/O. The schema
//! and the normalized value are produced in lockstep and stay structurally congruent.

use serde_json::{Map, Value};
use tracing::warn;

use crate::bail;
use crate::error::{ErrorKind, SluiceResult};
use crate::types::{
    FieldMode, FieldSchema, FieldType, render_wire_timestamp, wire_timestamp_parts,
};

/// Recognized input shapes, resolved before recursion.
///
/// Classification happens in one explicit step so the recursive normalizer can stay
/// exhaustive over a closed set of cases. The order of the checks matters: the wire
/// timestamp shape is an object and must win over the plain record case.
enum Shape<'a> {
    String,
    Boolean,
    Number,
    WireTimestamp(&'a Value, &'a Value),
    Sequence(&'a Vec<Value>),
    Record(&'a Map<String, Value>),
    Unsupported,
}

/// Classifies a JSON value into one of the shapes the normalizer understands.
fn classify(value: &Value) -> Shape<'_> {
    match value {
        Value::String(_) => Shape::String,
        Value::Bool(_) => Shape::Boolean,
        Value::Number(_) => Shape::Number,
        Value::Array(items) => Shape::Sequence(items),
        Value::Object(entries) => match wire_timestamp_parts(entries) {
            Some((seconds, nanoseconds)) => Shape::WireTimestamp(seconds, nanoseconds),
            None => Shape::Record(entries),
        },
        Value::Null => Shape::Unsupported,
    }
}

/// Infers the field schema for `value` and rewrites the value to conform to it.
///
/// Scalars pass through unchanged, wire timestamps are rewritten to their string
/// rendering, sequences must be non-empty and structurally homogeneous, and records keep
/// their normalizable entries in ascending key order. Unsupported shapes, including
/// `null`, fail with an error naming the field.
pub fn normalize(name: &str, value: &Value) -> SluiceResult<(FieldSchema, Value)> {
    match classify(value) {
        Shape::String => Ok((FieldSchema::new(name, FieldType::String), value.clone())),
        Shape::Boolean => Ok((FieldSchema::new(name, FieldType::Boolean), value.clone())),
        Shape::Number => Ok((FieldSchema::new(name, FieldType::Float), value.clone())),
        Shape::WireTimestamp(seconds, nanoseconds) => {
            normalize_timestamp(name, seconds, nanoseconds)
        }
        Shape::Sequence(items) => normalize_sequence(name, items),
        Shape::Record(entries) => normalize_record(name, entries),
        Shape::Unsupported => bail!(
            ErrorKind::UnsupportedValue,
            "Value shape is not supported",
            format!("field `{name}` cannot be mapped to a column type")
        ),
    }
}

/// Rewrites a wire timestamp into its fixed-precision string rendering.
fn normalize_timestamp(
    name: &str,
    seconds: &Value,
    nanoseconds: &Value,
) -> SluiceResult<(FieldSchema, Value)> {
    let Some(rendered) = render_wire_timestamp(seconds, nanoseconds) else {
        bail!(
            ErrorKind::UnsupportedValue,
            "Wire timestamp components are invalid",
            format!("field `{name}` carries seconds {seconds} and nanoseconds {nanoseconds}")
        );
    };

    Ok((
        FieldSchema::new(name, FieldType::Timestamp),
        Value::String(rendered),
    ))
}

/// Normalizes each element of a sequence under the same field name and checks that all
/// elements share one schema.
///
/// Mixed-shape sequences are rejected outright rather than merged or widened; per-element
/// strict equality keeps the resulting warehouse schema simple and avoids silently lossy
/// coercion.
fn normalize_sequence(name: &str, items: &[Value]) -> SluiceResult<(FieldSchema, Value)> {
    if items.is_empty() {
        bail!(
            ErrorKind::EmptyValue,
            "Sequences must carry at least one element",
            format!("field `{name}` is an empty array")
        );
    }

    let mut schemas = Vec::with_capacity(items.len());
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let (schema, value) = normalize(name, item)?;
        schemas.push(schema);
        values.push(value);
    }

    if schemas[0].is_repeated() {
        bail!(
            ErrorKind::NestedArrays,
            "Sequences of sequences are not supported",
            format!("field `{name}` is an array of arrays")
        );
    }

    if let Some(position) = schemas[1..].iter().position(|schema| schema != &schemas[0]) {
        bail!(
            ErrorKind::MixedArrayShapes,
            "Sequence elements must share one schema",
            format!(
                "field `{name}` element {} diverges from element 0",
                position + 1
            )
        );
    }

    let mut schema = schemas.swap_remove(0);
    schema.mode = FieldMode::Repeated;

    Ok((schema, Value::Array(values)))
}

/// Normalizes the entries of a plain object in ascending key order.
///
/// Entries that fail normalization are skipped with a logged warning instead of failing
/// the parent; one malformed sibling must not drop an otherwise good record. A record
/// with zero surviving entries is invalid.
fn normalize_record(name: &str, entries: &Map<String, Value>) -> SluiceResult<(FieldSchema, Value)> {
    let mut sorted: Vec<(&String, &Value)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut fields = Vec::with_capacity(sorted.len());
    let mut values = Map::new();
    for (key, value) in sorted {
        match normalize(key, value) {
            Ok((schema, normalized)) => {
                fields.push(schema);
                values.insert(key.clone(), normalized);
            }
            Err(err) => {
                warn!("skipping field {name}.{key}: {err}");
            }
        }
    }

    if fields.is_empty() {
        bail!(
            ErrorKind::EmptyValue,
            "Records must carry at least one normalizable entry",
            format!("field `{name}` has no usable entries")
        );
    }

    Ok((FieldSchema::record(name, fields), Value::Object(values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_string_passes_through() {
        let (schema, value) = normalize("name", &json!("Tom")).unwrap();
        assert_eq!(schema, FieldSchema::new("name", FieldType::String));
        assert_eq!(value, json!("Tom"));
    }

    #[test]
    fn normalize_boolean_passes_through() {
        let (schema, value) = normalize("active", &json!(true)).unwrap();
        assert_eq!(schema, FieldSchema::new("active", FieldType::Boolean));
        assert_eq!(value, json!(true));
    }

    #[test]
    fn normalize_number_infers_float() {
        let (schema, value) = normalize("foo", &json!(123)).unwrap();
        assert_eq!(schema, FieldSchema::new("foo", FieldType::Float));
        assert_eq!(value, json!(123));

        let (schema, value) = normalize("var", &json!(123.222)).unwrap();
        assert_eq!(schema.typ, FieldType::Float);
        assert_eq!(value, json!(123.222));
    }

    #[test]
    fn normalize_wire_timestamp_rewrites_value() {
        let input = json!({"seconds": 1576692986, "nanoseconds": 123456789});
        let (schema, value) = normalize("at", &input).unwrap();
        assert_eq!(schema, FieldSchema::new("at", FieldType::Timestamp));
        assert_eq!(value, json!("2019-12-18 17:09:46.123456789"));
    }

    #[test]
    fn normalize_invalid_wire_timestamp_fails() {
        let input = json!({"seconds": 0, "nanoseconds": 2_000_000_000});
        let err = normalize("at", &input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        assert!(err.detail().unwrap().contains("at"));
    }

    #[test]
    fn normalize_two_key_object_without_timestamp_keys_is_a_record() {
        let input = json!({"seconds": 3, "minutes": 2});
        let (schema, _) = normalize("span", &input).unwrap();
        assert_eq!(schema.typ, FieldType::Record);
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["minutes", "seconds"]);
    }

    #[test]
    fn normalize_null_fails() {
        let err = normalize("missing", &Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        assert!(err.detail().unwrap().contains("missing"));
    }

    #[test]
    fn normalize_sequence_repeats_element_schema() {
        let (schema, value) = normalize("age", &json!([30, 21, 33])).unwrap();
        assert_eq!(schema.mode, FieldMode::Repeated);
        assert_eq!(schema.typ, FieldType::Float);
        assert_eq!(value, json!([30, 21, 33]));
    }

    #[test]
    fn normalize_empty_sequence_fails() {
        let err = normalize("age", &json!([])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);
    }

    #[test]
    fn normalize_nested_sequences_fail() {
        let err = normalize("grid", &json!([[1, 2], [3, 4]])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NestedArrays);
    }

    #[test]
    fn normalize_mixed_sequence_fails() {
        let err = normalize("mixed", &json!([30, "Tom"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MixedArrayShapes);
    }

    #[test]
    fn normalize_sequence_of_differing_records_fails() {
        let input = json!([{"a": 1}, {"b": 1}]);
        let err = normalize("rows", &input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MixedArrayShapes);
    }

    #[test]
    fn normalize_sequence_of_reordered_records_is_homogeneous() {
        // The per-element schemas are canonically sorted, so key order in the input must
        // not break the homogeneity check.
        let input = json!([{"a": 1, "b": "x"}, {"b": "y", "a": 2}]);
        let (schema, _) = normalize("rows", &input).unwrap();
        assert_eq!(schema.mode, FieldMode::Repeated);
        assert_eq!(schema.typ, FieldType::Record);
    }

    #[test]
    fn normalize_record_sorts_fields_by_name() {
        let input = json!({"age": [30, 21, 33], "foo": 123, "name": "Tom", "var": 123.222});
        let (schema, value) = normalize("root", &input).unwrap();

        let described: Vec<(&str, FieldMode, FieldType)> = schema
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.mode, f.typ))
            .collect();
        assert_eq!(
            described,
            vec![
                ("age", FieldMode::Repeated, FieldType::Float),
                ("foo", FieldMode::Required, FieldType::Float),
                ("name", FieldMode::Required, FieldType::String),
                ("var", FieldMode::Required, FieldType::Float),
            ]
        );

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["age", "foo", "name", "var"]);
    }

    #[test]
    fn normalize_record_skips_failing_entries() {
        let input = json!({"good": "value", "bad": null});
        let (schema, value) = normalize("root", &input).unwrap();
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.fields[0].name, "good");
        assert_eq!(value, json!({"good": "value"}));
    }

    #[test]
    fn normalize_record_with_only_failing_entries_fails() {
        let input = json!({"bad": null, "worse": []});
        let err = normalize("root", &input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);
    }

    #[test]
    fn normalize_empty_record_fails() {
        let err = normalize("root", &json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);
    }

    #[test]
    fn normalize_nested_record_stays_congruent() {
        let input = json!({"outer": {"b": true, "a": {"seconds": 0, "nanoseconds": 1}}});
        let (schema, value) = normalize("root", &input).unwrap();

        let outer = &schema.fields[0];
        assert_eq!(outer.typ, FieldType::Record);
        assert_eq!(outer.fields[0].name, "a");
        assert_eq!(outer.fields[0].typ, FieldType::Timestamp);
        assert_eq!(outer.fields[1].name, "b");
        assert_eq!(
            value,
            json!({"outer": {"a": "1970-01-01 00:00:00.1", "b": true}})
        );
    }
}
