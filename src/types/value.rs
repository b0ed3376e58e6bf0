//! Wire timestamp recognition and rendering.
//!
//! Instants arrive on the wire as an object with exactly two numeric entries, `seconds`
//! and `nanoseconds`. They are rewritten during normalization into a fixed-precision
//! timestamp string whose fractional part is the raw nanosecond integer. The fraction is
//! deliberately not zero-padded to nine digits; the quirk is observable by consumers of
//! the warehouse tables and must be preserved.

use chrono::DateTime;
use serde_json::{Map, Value};

/// Key under which the whole seconds of a wire timestamp are delivered.
pub const SECONDS_KEY: &str = "seconds";
/// Key under which the sub-second nanoseconds of a wire timestamp are delivered.
pub const NANOSECONDS_KEY: &str = "nanoseconds";

/// Upper bound (exclusive) for the nanosecond component.
const MAX_NANOSECONDS: i64 = 1_000_000_000;

/// Returns the raw components when the object matches the wire timestamp shape.
///
/// The shape check only requires both entries to be numbers; component validation is left
/// to [`render_wire_timestamp`] so that a malformed timestamp is an error rather than
/// silently re-interpreted as a nested record.
pub fn wire_timestamp_parts(entries: &Map<String, Value>) -> Option<(&Value, &Value)> {
    if entries.len() != 2 {
        return None;
    }

    let seconds = entries.get(SECONDS_KEY)?;
    let nanoseconds = entries.get(NANOSECONDS_KEY)?;
    if seconds.is_number() && nanoseconds.is_number() {
        return Some((seconds, nanoseconds));
    }

    None
}

/// Renders a wire timestamp as `YYYY-MM-DD HH:MM:SS.<nanoseconds>` in UTC.
///
/// Returns [`None`] when the components are fractional, the nanoseconds fall outside
/// `[0, 1e9)`, or the seconds do not map to a representable instant.
pub fn render_wire_timestamp(seconds: &Value, nanoseconds: &Value) -> Option<String> {
    let seconds = seconds.as_i64()?;
    let nanoseconds = nanoseconds.as_i64()?;
    if !(0..MAX_NANOSECONDS).contains(&nanoseconds) {
        return None;
    }

    let instant = DateTime::from_timestamp(seconds, 0)?;

    Some(format!(
        "{}.{}",
        instant.format("%Y-%m-%d %H:%M:%S"),
        nanoseconds
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn recognizes_wire_timestamp_shape() {
        let entries = parts(json!({"seconds": 1576692986, "nanoseconds": 123456789}));
        assert!(wire_timestamp_parts(&entries).is_some());
    }

    #[test]
    fn rejects_extra_keys() {
        let entries = parts(json!({"seconds": 1, "nanoseconds": 2, "zone": "utc"}));
        assert!(wire_timestamp_parts(&entries).is_none());
    }

    #[test]
    fn rejects_non_numeric_components() {
        let entries = parts(json!({"seconds": "1576692986", "nanoseconds": 123456789}));
        assert!(wire_timestamp_parts(&entries).is_none());
    }

    #[test]
    fn renders_exact_utc_instant() {
        let rendered = render_wire_timestamp(&json!(1576692986), &json!(123456789)).unwrap();
        assert_eq!(rendered, "2019-12-18 17:09:46.123456789");
    }

    #[test]
    fn keeps_raw_nanoseconds_unpadded() {
        let rendered = render_wire_timestamp(&json!(1576692986), &json!(5)).unwrap();
        assert_eq!(rendered, "2019-12-18 17:09:46.5");
    }

    #[test]
    fn rejects_fractional_components() {
        assert!(render_wire_timestamp(&json!(1576692986.5), &json!(0)).is_none());
        assert!(render_wire_timestamp(&json!(0), &json!(0.25)).is_none());
    }

    #[test]
    fn rejects_out_of_range_nanoseconds() {
        assert!(render_wire_timestamp(&json!(0), &json!(1_000_000_000)).is_none());
        assert!(render_wire_timestamp(&json!(0), &json!(-1)).is_none());
    }
}
