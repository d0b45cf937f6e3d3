//! Per-model attribute descriptors.
//!
//! Every model type registers a [`Schema`] once, usually behind a
//! `LazyLock`, describing each field's attribute name, semantic type, and
//! role. Persisted fields carry typed accessors so the marshaller can read
//! and write them without runtime reflection.
//!
//! ```ignore
//! static SCHEMA: LazyLock<Schema<Order>> = LazyLock::new(|| {
//!     Schema::<Order>::builder("Order")
//!         .hash_key("id", |m| &m.id, |m| &mut m.id)
//!         .auto_generated()
//!         .attribute("total", |m| &m.total, |m| &mut m.total)
//!         .ignored("scratch", AttributeType::String)
//!         .build()
//!         .expect("valid Order schema")
//! });
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::error::{ConversionError, MappingError};
use crate::value::{AttributeField, AttributeType, AttributeValue};

// ═══════════════════════════════════════════════════════════════════════
//  Model contract
// ═══════════════════════════════════════════════════════════════════════

/// Access to a model's primary key.
pub trait Keyed {
    /// Hash (partition) key value.
    fn hash_key(&self) -> String;

    /// Range (sort) key value, empty when the model has none.
    fn range_key(&self) -> String {
        String::new()
    }
}

/// A type the mapper can persist.
pub trait Model: Keyed + Default + Send + Sync + 'static {
    /// The type's descriptor set, built once.
    fn schema() -> &'static Schema<Self>;
}

// ═══════════════════════════════════════════════════════════════════════
//  Descriptors
// ═══════════════════════════════════════════════════════════════════════

/// Role of an attribute within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeRole {
    Plain,
    HashKey,
    RangeKey,
    /// Never persisted or cached.
    Ignored,
}

type Reader<M> = Box<dyn Fn(&M) -> Result<Option<AttributeValue>, ConversionError> + Send + Sync>;
type Writer<M> = Box<dyn Fn(&mut M, &AttributeValue) -> Result<(), ConversionError> + Send + Sync>;

struct Accessor<M> {
    read: Reader<M>,
    write: Writer<M>,
}

/// Description of one model field.
pub struct AttributeDescriptor<M> {
    name: &'static str,
    attribute_type: AttributeType,
    role: AttributeRole,
    auto_generated: bool,
    accessor: Option<Accessor<M>>,
}

impl<M> AttributeDescriptor<M> {
    /// Attribute name as it appears in attribute maps and payloads.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn role(&self) -> AttributeRole {
        self.role
    }

    pub fn is_key(&self) -> bool {
        matches!(self.role, AttributeRole::HashKey | AttributeRole::RangeKey)
    }

    pub fn is_ignored(&self) -> bool {
        self.role == AttributeRole::Ignored
    }

    /// Whether an empty value is filled with a generated identifier on save.
    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    /// Read the field as a tagged value; `None` when absent or ignored.
    pub fn read(&self, model: &M) -> Result<Option<AttributeValue>, ConversionError> {
        match &self.accessor {
            Some(accessor) => (accessor.read)(model),
            None => Ok(None),
        }
    }

    /// Write a tagged value into the field; ignored fields are untouched.
    pub fn write(&self, model: &mut M, value: &AttributeValue) -> Result<(), ConversionError> {
        match &self.accessor {
            Some(accessor) => (accessor.write)(model, value),
            None => Ok(()),
        }
    }
}

impl<M> fmt::Debug for AttributeDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("attribute_type", &self.attribute_type)
            .field("role", &self.role)
            .field("auto_generated", &self.auto_generated)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Schema
// ═══════════════════════════════════════════════════════════════════════

/// Immutable descriptor set for model type `M`.
#[derive(Debug)]
pub struct Schema<M> {
    type_name: &'static str,
    attributes: Vec<AttributeDescriptor<M>>,
    hash_key: usize,
    range_key: Option<usize>,
    auto_generated: Option<usize>,
}

impl<M: 'static> Schema<M> {
    /// Start describing model type `type_name`.
    pub fn builder(type_name: &'static str) -> SchemaBuilder<M> {
        SchemaBuilder {
            type_name,
            attributes: Vec::new(),
            auto_generated: Vec::new(),
            auto_generated_without_attribute: false,
        }
    }
}

impl<M> Schema<M> {
    /// Model type name, used for table names and cache keys.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// All descriptors in declaration order.
    pub fn attributes(&self) -> &[AttributeDescriptor<M>] {
        &self.attributes
    }

    /// Descriptors that are persisted (everything not ignored).
    pub fn persisted(&self) -> impl Iterator<Item = &AttributeDescriptor<M>> {
        self.attributes.iter().filter(|a| !a.is_ignored())
    }

    /// Look up a descriptor by attribute name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor<M>> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn hash_key(&self) -> &AttributeDescriptor<M> {
        &self.attributes[self.hash_key]
    }

    pub fn range_key(&self) -> Option<&AttributeDescriptor<M>> {
        self.range_key.map(|i| &self.attributes[i])
    }

    /// The key attribute filled by the key generator, if any.
    pub fn auto_generated_key(&self) -> Option<&AttributeDescriptor<M>> {
        self.auto_generated.map(|i| &self.attributes[i])
    }

    /// Names of attributes excluded from persistence.
    pub fn ignored_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.is_ignored())
            .map(|a| a.name)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Builder
// ═══════════════════════════════════════════════════════════════════════

/// Builder for [`Schema`].
pub struct SchemaBuilder<M> {
    type_name: &'static str,
    attributes: Vec<AttributeDescriptor<M>>,
    auto_generated: Vec<usize>,
    auto_generated_without_attribute: bool,
}

impl<M: 'static> SchemaBuilder<M> {
    /// Declare the hash key field.
    pub fn hash_key<T: AttributeField + 'static>(
        self,
        name: &'static str,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> Self {
        self.field(name, AttributeRole::HashKey, get, get_mut)
    }

    /// Declare the range key field.
    pub fn range_key<T: AttributeField + 'static>(
        self,
        name: &'static str,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> Self {
        self.field(name, AttributeRole::RangeKey, get, get_mut)
    }

    /// Declare a plain persisted field.
    pub fn attribute<T: AttributeField + 'static>(
        self,
        name: &'static str,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> Self {
        self.field(name, AttributeRole::Plain, get, get_mut)
    }

    /// Declare a field that is never persisted nor cached.
    pub fn ignored(mut self, name: &'static str, attribute_type: AttributeType) -> Self {
        self.attributes.push(AttributeDescriptor {
            name,
            attribute_type,
            role: AttributeRole::Ignored,
            auto_generated: false,
            accessor: None,
        });
        self
    }

    /// Mark the most recently declared attribute as an auto-generated key.
    ///
    /// Calling this before any attribute is declared makes `build` fail.
    pub fn auto_generated(mut self) -> Self {
        match self.attributes.len().checked_sub(1) {
            Some(last) => self.auto_generated.push(last),
            None => self.auto_generated_without_attribute = true,
        }
        self
    }

    /// Validate and freeze the schema.
    pub fn build(mut self) -> Result<Schema<M>, MappingError> {
        let type_name = self.type_name;
        let invalid = |reason: String| MappingError::InvalidSchema { type_name, reason };

        if self.auto_generated_without_attribute {
            return Err(invalid(
                "auto_generated() called before any attribute was declared".into(),
            ));
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if attr.name.is_empty() {
                return Err(invalid("attribute names must not be empty".into()));
            }
            if !seen.insert(attr.name) {
                return Err(invalid(format!("duplicate attribute `{}`", attr.name)));
            }
        }

        let hash_keys: Vec<usize> = self.positions(AttributeRole::HashKey);
        let hash_key = match hash_keys.as_slice() {
            [index] => *index,
            [] => return Err(invalid("no hash key declared".into())),
            _ => return Err(invalid("more than one hash key declared".into())),
        };

        let range_keys = self.positions(AttributeRole::RangeKey);
        if range_keys.len() > 1 {
            return Err(invalid("more than one range key declared".into()));
        }
        let range_key = range_keys.first().copied();

        let auto_generated = match self.auto_generated.as_slice() {
            [] => None,
            [index] => {
                let attr = &self.attributes[*index];
                if !attr.is_key() {
                    return Err(invalid(format!(
                        "auto-generated attribute `{}` must be a hash or range key",
                        attr.name
                    )));
                }
                if !attr.attribute_type.is_string_like() {
                    return Err(invalid(format!(
                        "auto-generated attribute `{}` must be a string or identifier, not {}",
                        attr.name, attr.attribute_type
                    )));
                }
                Some(*index)
            }
            _ => return Err(invalid("more than one auto-generated key declared".into())),
        };
        if let Some(index) = auto_generated {
            self.attributes[index].auto_generated = true;
        }

        Ok(Schema {
            type_name,
            attributes: self.attributes,
            hash_key,
            range_key,
            auto_generated,
        })
    }

    fn positions(&self, role: AttributeRole) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role == role)
            .map(|(i, _)| i)
            .collect()
    }

    fn field<T: AttributeField + 'static>(
        mut self,
        name: &'static str,
        role: AttributeRole,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> Self {
        let read: Reader<M> = Box::new(move |model: &M| get(model).to_attribute());
        let write: Writer<M> = Box::new(move |model: &mut M, value: &AttributeValue| {
            *get_mut(model) = T::from_attribute(value)?;
            Ok(())
        });
        self.attributes.push(AttributeDescriptor {
            name,
            attribute_type: T::TYPE,
            role,
            auto_generated: false,
            accessor: Some(Accessor { read, write }),
        });
        self
    }
}

// ── tests ────────────────────────────────────────────────────────────
