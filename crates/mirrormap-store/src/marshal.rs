//! Model ⇄ attribute map conversion.
//!
//! Pure functions driven by the model's [`Schema`](crate::schema::Schema).
//! Ignored attributes are skipped in both directions; unknown attributes in
//! an incoming map are ignored.

use crate::error::MappingError;
use crate::schema::Model;
use crate::value::AttributeMap;

/// Convert a model into its attribute map.
///
/// Fails if a key attribute is empty and is not marked auto-generated.
pub fn to_attribute_map<M: Model>(model: &M) -> Result<AttributeMap, MappingError> {
    let schema = M::schema();
    let mut map = AttributeMap::new();

    for attr in schema.persisted() {
        let value = attr
            .read(model)
            .map_err(|source| MappingError::Conversion {
                type_name: schema.type_name(),
                attribute: attr.name(),
                source,
            })?
            .filter(|v| !(attr.is_key() && v.is_empty()));

        match value {
            Some(value) => {
                map.insert(attr.name().to_string(), value);
            }
            None if attr.is_key() && !attr.is_auto_generated() => {
                return Err(MappingError::MissingKey {
                    type_name: schema.type_name(),
                    attribute: attr.name(),
                });
            }
            None => {}
        }
    }

    Ok(map)
}

/// Build a model of type `M` from an attribute map.
///
/// Fields without a matching attribute, and all ignored fields, keep their
/// default value.
pub fn from_attribute_map<M: Model>(map: &AttributeMap) -> Result<M, MappingError> {
    let schema = M::schema();
    let mut model = M::default();

    for attr in schema.persisted() {
        let Some(value) = map.get(attr.name()) else {
            continue;
        };
        attr.write(&mut model, value)
            .map_err(|source| MappingError::Conversion {
                type_name: schema.type_name(),
                attribute: attr.name(),
                source,
            })?;
    }

    Ok(model)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{AutoKeyModel, DataType};
    use crate::value::{AttributeType, AttributeValue};

    #[test]
    fn round_trip_preserves_fields() {
        let model = DataType::sample("abc", "1");
        let map = to_attribute_map(&model).unwrap();
        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn ignored_attribute_is_never_marshalled() {
        let mut model = DataType::sample("abc", "1");
        model.ignored = Some("x".into());

        let map = to_attribute_map(&model).unwrap();
        assert!(!map.contains_key("ignored"));

        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back.ignored, None);
    }

    #[test]
    fn ignored_attribute_in_map_is_not_restored() {
        let mut map = to_attribute_map(&DataType::sample("abc", "1")).unwrap();
        map.insert("ignored".into(), AttributeValue::S("sneaky".into()));

        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back.ignored, None);
    }

    #[test]
    fn typed_values_use_expected_tags() {
        let model = DataType::sample("abc", "1");
        let map = to_attribute_map(&model).unwrap();

        assert_eq!(map["hashKey"], AttributeValue::S("abc".into()));
        assert_eq!(map["booleanPrimitive"], AttributeValue::Bool(true));
        assert_eq!(map["integer"], AttributeValue::N("42".into()));
        assert_eq!(
            map["date"],
            AttributeValue::N(model.date.unwrap().timestamp_millis().to_string())
        );
        assert_eq!(map["binary"], AttributeValue::B(vec![0xde, 0xad]));
    }

    #[test]
    fn absent_optional_values_are_omitted() {
        let mut model = DataType::sample("abc", "1");
        model.string = None;
        model.date = None;

        let map = to_attribute_map(&model).unwrap();
        assert!(!map.contains_key("string"));
        assert!(!map.contains_key("date"));

        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn empty_hash_key_fails() {
        let model = DataType::sample("", "1");
        let err = to_attribute_map(&model).unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingKey {
                type_name: "DataType",
                attribute: "hashKey",
            }
        );
    }

    #[test]
    fn empty_range_key_fails() {
        let model = DataType::sample("abc", "");
        let err = to_attribute_map(&model).unwrap_err();
        assert!(matches!(
            err,
            MappingError::MissingKey {
                attribute: "rangeKey",
                ..
            }
        ));
    }

    #[test]
    fn empty_auto_generated_key_is_allowed() {
        let model = AutoKeyModel {
            range_key: "r".into(),
            ..AutoKeyModel::default()
        };
        let map = to_attribute_map(&model).unwrap();
        assert!(!map.contains_key("hashKey"));
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        let mut map = to_attribute_map(&DataType::sample("abc", "1")).unwrap();
        map.insert("addedLater".into(), AttributeValue::S("whatever".into()));

        let back: DataType = from_attribute_map(&map).unwrap();
        assert_eq!(back, DataType::sample("abc", "1"));
    }

    #[test]
    fn irreconcilable_conversion_fails() {
        let mut map = to_attribute_map(&DataType::sample("abc", "1")).unwrap();
        map.insert("integer".into(), AttributeValue::S("not a number".into()));

        let err = from_attribute_map::<DataType>(&map).unwrap_err();
        match err {
            MappingError::Conversion {
                type_name,
                attribute,
                source,
            } => {
                assert_eq!(type_name, "DataType");
                assert_eq!(attribute, "integer");
                assert_eq!(source.expected, AttributeType::Number);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
