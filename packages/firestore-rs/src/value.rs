// Decoding of Firestore's typed-JSON value encoding into plain JSON.
//
// The REST API wraps every field in a type tag, e.g.
// `{"stringValue": "active"}` or `{"integerValue": "1000"}` (integers are
// string-encoded on the wire). Timestamps decode to a `{seconds, nanos}`
// map, which is also the shape mobile clients produce when they serialize
// a timestamp themselves (as `{_seconds, _nanoseconds}` inside a map).

use chrono::DateTime;
use serde_json::{json, Map, Value};

/// Decode a `fields` object from a Firestore document into plain JSON.
pub fn decode_fields(fields: &Value) -> Value {
    let mut out = Map::new();
    if let Some(map) = fields.as_object() {
        for (name, value) in map {
            out.insert(name.clone(), decode_value(value));
        }
    }
    Value::Object(out)
}

/// Decode a single typed Firestore value.
pub fn decode_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return value.clone();
    };

    if let Some(s) = map.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(raw) = map.get("integerValue") {
        // String-encoded on the wire; tolerate a bare number too.
        if let Some(n) = raw.as_i64() {
            return json!(n);
        }
        if let Some(n) = raw.as_str().and_then(|s| s.parse::<i64>().ok()) {
            return json!(n);
        }
        return Value::Null;
    }
    if let Some(n) = map.get("doubleValue").and_then(Value::as_f64) {
        return json!(n);
    }
    if let Some(b) = map.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if map.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(ts) = map.get("timestampValue").and_then(Value::as_str) {
        return match DateTime::parse_from_rfc3339(ts) {
            Ok(parsed) => json!({
                "seconds": parsed.timestamp(),
                "nanos": parsed.timestamp_subsec_nanos(),
            }),
            Err(_) => Value::Null,
        };
    }
    if let Some(inner) = map.get("mapValue") {
        return decode_fields(inner.get("fields").unwrap_or(&Value::Null));
    }
    if let Some(values) = map.get("arrayValue").and_then(|a| a.get("values")) {
        let items = values
            .as_array()
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(r) = map.get("referenceValue").and_then(Value::as_str) {
        return Value::String(r.to_string());
    }

    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scalar_values() {
        assert_eq!(
            decode_value(&json!({"stringValue": "active"})),
            json!("active")
        );
        assert_eq!(decode_value(&json!({"integerValue": "1000"})), json!(1000));
        assert_eq!(decode_value(&json!({"integerValue": 7})), json!(7));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
    }

    #[test]
    fn decodes_timestamp_to_seconds_map() {
        let decoded = decode_value(&json!({"timestampValue": "1970-01-01T00:16:40Z"}));
        assert_eq!(decoded["seconds"], json!(1000));
        assert_eq!(decoded["nanos"], json!(0));
    }

    #[test]
    fn decodes_client_written_timestamp_map() {
        // A timestamp serialized by the mobile client arrives as a plain
        // map with string-encoded integers.
        let decoded = decode_value(&json!({
            "mapValue": {"fields": {
                "_seconds": {"integerValue": "1000"},
                "_nanoseconds": {"integerValue": "0"}
            }}
        }));
        assert_eq!(decoded, json!({"_seconds": 1000, "_nanoseconds": 0}));
    }

    #[test]
    fn decodes_document_fields() {
        let fields = json!({
            "status": {"stringValue": "active"},
            "price": {"integerValue": "250000"},
            "expiryDate": {"timestampValue": "2026-01-02T00:00:00Z"}
        });
        let decoded = decode_fields(&fields);
        assert_eq!(decoded["status"], json!("active"));
        assert_eq!(decoded["price"], json!(250000));
        assert!(decoded["expiryDate"]["seconds"].is_i64());
    }
}
