//! Auto-generated key filling.

use uuid::Uuid;

use crate::error::MappingError;
use crate::schema::Model;
use crate::value::AttributeValue;

/// Source of fresh, globally unique key values.
pub trait KeyGenerator: Send + Sync {
    /// Produce a new identifier. For identifier-typed key fields the value
    /// must be a canonical UUID string.
    fn generate(&self) -> String;
}

/// Generates time-ordered UUID v7 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Fill the model's auto-generated key if it is empty.
///
/// Returns the generated value, or `None` when the model has no
/// auto-generated key or it already holds a value.
pub fn ensure_key<M: Model>(
    model: &mut M,
    generator: &dyn KeyGenerator,
) -> Result<Option<String>, MappingError> {
    let schema = M::schema();
    let Some(attr) = schema.auto_generated_key() else {
        return Ok(None);
    };

    let conversion = |source| MappingError::Conversion {
        type_name: schema.type_name(),
        attribute: attr.name(),
        source,
    };

    let current = attr.read(model).map_err(conversion)?;
    if current.is_some_and(|v| !v.is_empty()) {
        return Ok(None);
    }

    let key = generator.generate();
    attr.write(model, &AttributeValue::S(key.clone()))
        .map_err(conversion)?;
    tracing::debug!(
        type_name = schema.type_name(),
        attribute = attr.name(),
        key = %key,
        "generated key"
    );
    Ok(Some(key))
}

// ── tests ────────────────────────────────────────────────────────────
