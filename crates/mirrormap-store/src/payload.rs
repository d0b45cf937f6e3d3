//! Cache payload codec.
//!
//! A payload is a flat JSON object: strings and identifiers as JSON strings,
//! numbers and dates (epoch milliseconds) as JSON numbers, booleans as JSON
//! booleans, binary as base64 strings. Decoding yields untyped `S`/`N`/`BOOL`
//! values; the marshaller coerces them against the schema.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Number, Value};

use crate::error::{CacheError, CacheResult};
use crate::value::{AttributeMap, AttributeValue};

/// Encode an attribute map as a cache payload.
pub fn encode(map: &AttributeMap) -> CacheResult<String> {
    let mut object = Map::with_capacity(map.len());
    for (name, value) in map {
        let json = match value {
            AttributeValue::S(s) => Value::String(s.clone()),
            AttributeValue::N(n) => Value::Number(json_number(n).ok_or_else(|| {
                CacheError::Payload(format!("attribute `{name}` is not a number: {n}"))
            })?),
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::B(bytes) => Value::String(BASE64.encode(bytes)),
        };
        object.insert(name.clone(), json);
    }
    Ok(serde_json::to_string(&Value::Object(object))?)
}

/// Exact JSON number for `n`, falling back to the nearest finite `f64` for
/// long decimal text such as `f64::MAX` printed in full.
fn json_number(n: &str) -> Option<Number> {
    n.parse::<Number>()
        .ok()
        .or_else(|| n.parse::<f64>().ok().and_then(Number::from_f64))
}

/// Decode a cache payload into an attribute map.
///
/// `null` members are treated as absent; arrays and nested objects are
/// rejected.
pub fn decode(payload: &str) -> CacheResult<AttributeMap> {
    let Value::Object(object) = serde_json::from_str::<Value>(payload)? else {
        return Err(CacheError::Payload("payload is not a JSON object".into()));
    };

    let mut map = AttributeMap::new();
    for (name, json) in object {
        let value = match json {
            Value::Null => continue,
            Value::String(s) => AttributeValue::S(s),
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Array(_) | Value::Object(_) => {
                return Err(CacheError::Payload(format!(
                    "attribute `{name}` has an unsupported nested value"
                )));
            }
        };
        map.insert(name, value);
    }
    Ok(map)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::DataType;
    use crate::marshal::{from_attribute_map, to_attribute_map};

    #[test]
    fn encodes_native_json_types() {
        let mut map = AttributeMap::new();
        map.insert("s".into(), AttributeValue::S("hello".into()));
        map.insert("n".into(), AttributeValue::N("1.5".into()));
        map.insert("b".into(), AttributeValue::Bool(true));
        map.insert("bin".into(), AttributeValue::B(vec![0, 1, 2]));

        let payload = encode(&map).unwrap();
        assert_eq!(payload, r#"{"b":true,"bin":"AAEC","n":1.5,"s":"hello"}"#);
    }

    #[test]
    fn decoded_payload_maps_back_to_model() {
        let model = DataType::sample("abc", "1");
        let payload = encode(&to_attribute_map(&model).unwrap()).unwrap();

        let map = decode(&payload).unwrap();
        assert!(matches!(map["binary"], AttributeValue::S(_)));

        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn null_members_are_skipped() {
        let map = decode(r#"{"a":null,"b":"x"}"#).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["b"], AttributeValue::S("x".into()));
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(matches!(decode("[1,2]"), Err(CacheError::Payload(_))));
        assert!(matches!(decode("not json"), Err(CacheError::Json(_))));
    }

    #[test]
    fn rejects_nested_values() {
        let err = decode(r#"{"a":{"b":1}}"#).unwrap_err();
        assert!(err.to_string().contains("`a`"));
    }

    #[test]
    fn extreme_floats_survive_the_payload() {
        let mut map = AttributeMap::new();
        map.insert("d".into(), AttributeValue::number(f64::MAX));
        map.insert("f".into(), AttributeValue::number(f32::MAX));
        map.insert("tiny".into(), AttributeValue::number(f64::MIN_POSITIVE));

        let back = decode(&encode(&map).unwrap()).unwrap();
        let AttributeValue::N(d) = &back["d"] else {
            panic!("expected number, got {:?}", back["d"]);
        };
        let AttributeValue::N(f) = &back["f"] else {
            panic!("expected number, got {:?}", back["f"]);
        };
        let AttributeValue::N(tiny) = &back["tiny"] else {
            panic!("expected number, got {:?}", back["tiny"]);
        };
        assert_eq!(d.parse::<f64>().unwrap(), f64::MAX);
        assert_eq!(f.parse::<f32>().unwrap(), f32::MAX);
        assert_eq!(tiny.parse::<f64>().unwrap(), f64::MIN_POSITIVE);
    }

    #[test]
    fn rejects_non_finite_number_text() {
        let mut map = AttributeMap::new();
        map.insert("n".into(), AttributeValue::N("inf".into()));
        assert!(matches!(encode(&map), Err(CacheError::Payload(_))));
    }

    #[test]
    fn rejects_malformed_number() {
        let mut map = AttributeMap::new();
        map.insert("n".into(), AttributeValue::N("abc".into()));
        assert!(matches!(encode(&map), Err(CacheError::Payload(_))));
    }
}
