//! Model types shared by the unit tests.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::schema::{Keyed, Model, Schema};
use crate::value::AttributeType;

/// A model exercising every semantic type plus an ignored field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataType {
    pub hash_key: String,
    pub range_key: String,
    pub string: Option<String>,
    pub boolean_primitive: bool,
    pub integer: i64,
    pub double: f64,
    pub date: Option<DateTime<Utc>>,
    pub binary: Vec<u8>,
    pub id: Option<Uuid>,
    pub ignored: Option<String>,
}

impl DataType {
    pub fn sample(hash_key: &str, range_key: &str) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: range_key.into(),
            string: Some("hello".into()),
            boolean_primitive: true,
            integer: 42,
            double: 2.5,
            date: DateTime::from_timestamp_millis(1_700_000_000_123),
            binary: vec![0xde, 0xad],
            id: Some(Uuid::now_v7()),
            ignored: None,
        }
    }

    pub fn with_random_key() -> Self {
        Self::sample(&Uuid::now_v7().to_string(), "1")
    }
}

impl Keyed for DataType {
    fn hash_key(&self) -> String {
        self.hash_key.clone()
    }

    fn range_key(&self) -> String {
        self.range_key.clone()
    }
}

static DATA_TYPE: LazyLock<Schema<DataType>> = LazyLock::new(|| {
    Schema::<DataType>::builder("DataType")
        .hash_key("hashKey", |m| &m.hash_key, |m| &mut m.hash_key)
        .range_key("rangeKey", |m| &m.range_key, |m| &mut m.range_key)
        .attribute("string", |m| &m.string, |m| &mut m.string)
        .attribute(
            "booleanPrimitive",
            |m| &m.boolean_primitive,
            |m| &mut m.boolean_primitive,
        )
        .attribute("integer", |m| &m.integer, |m| &mut m.integer)
        .attribute("double", |m| &m.double, |m| &mut m.double)
        .attribute("date", |m| &m.date, |m| &mut m.date)
        .attribute("binary", |m| &m.binary, |m| &mut m.binary)
        .attribute("id", |m| &m.id, |m| &mut m.id)
        .ignored("ignored", AttributeType::String)
        .build()
        .expect("valid DataType schema")
});

impl Model for DataType {
    fn schema() -> &'static Schema<Self> {
        &DATA_TYPE
    }
}

/// A model whose hash key is generated on first save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoKeyModel {
    pub hash_key: String,
    pub range_key: String,
    pub string: Option<String>,
}

impl Keyed for AutoKeyModel {
    fn hash_key(&self) -> String {
        self.hash_key.clone()
    }

    fn range_key(&self) -> String {
        self.range_key.clone()
    }
}

static AUTO_KEY_MODEL: LazyLock<Schema<AutoKeyModel>> = LazyLock::new(|| {
    Schema::<AutoKeyModel>::builder("AutoKeyModel")
        .hash_key("hashKey", |m| &m.hash_key, |m| &mut m.hash_key)
        .auto_generated()
        .range_key("rangeKey", |m| &m.range_key, |m| &mut m.range_key)
        .attribute("string", |m| &m.string, |m| &mut m.string)
        .build()
        .expect("valid AutoKeyModel schema")
});

impl Model for AutoKeyModel {
    fn schema() -> &'static Schema<Self> {
        &AUTO_KEY_MODEL
    }
}

/// A hash-key-only model with a secret that must never leave the process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub user: String,
    pub display_name: String,
    pub secret: String,
}

impl Keyed for Profile {
    fn hash_key(&self) -> String {
        self.user.clone()
    }
}

static PROFILE: LazyLock<Schema<Profile>> = LazyLock::new(|| {
    Schema::<Profile>::builder("Profile")
        .hash_key("user", |m| &m.user, |m| &mut m.user)
        .attribute("displayName", |m| &m.display_name, |m| &mut m.display_name)
        .ignored("secret", AttributeType::String)
        .build()
        .expect("valid Profile schema")
});

impl Model for Profile {
    fn schema() -> &'static Schema<Self> {
        &PROFILE
    }
}
