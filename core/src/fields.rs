//! Field capabilities used to feed path segments, query parameters and
//! headers into a `RestRequest`.
//!
//! # Design
//! A request never inspects arbitrary values at runtime. Instead a value
//! states how it renders as a single field (`FieldValue`) or as a set of
//! named fields (`Fields`). `None` renders as an absent value, which the
//! builder turns into an empty string so `key=` stays in the query.
//!
//! Record-like types reuse their serde representation through
//! `FieldSet::from_serialize`, which keeps field declaration order.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::error::BuildError;

/// A value that renders as a single field string.
pub trait FieldValue {
    /// The string form of the value, or `None` when the value is absent.
    fn field_value(&self) -> Option<String>;
}

macro_rules! display_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn field_value(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_field_value!(
    str, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64, uuid::Uuid, url::Url,
);

impl<T: FieldValue + ?Sized> FieldValue for &T {
    fn field_value(&self) -> Option<String> {
        (**self).field_value()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn field_value(&self) -> Option<String> {
        self.as_ref().and_then(FieldValue::field_value)
    }
}

impl FieldValue for Value {
    fn field_value(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            nested => Some(nested.to_string()),
        }
    }
}

/// A value that renders as an ordered set of named fields.
pub trait Fields {
    fn fields(&self) -> Vec<(String, Option<String>)>;
}

impl<K: AsRef<str>, V: FieldValue> Fields for [(K, V)] {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.field_value()))
            .collect()
    }
}

impl<K: AsRef<str>, V: FieldValue, const N: usize> Fields for [(K, V); N] {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.as_slice().fields()
    }
}

impl<K: AsRef<str>, V: FieldValue> Fields for Vec<(K, V)> {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.as_slice().fields()
    }
}

impl<K: AsRef<str>, V: FieldValue> Fields for BTreeMap<K, V> {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.field_value()))
            .collect()
    }
}

/// Iteration order follows the map's own order, which is unspecified.
impl<K: AsRef<str>, V: FieldValue, S> Fields for HashMap<K, V, S> {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.field_value()))
            .collect()
    }
}

impl<T: Fields + ?Sized> Fields for &T {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        (**self).fields()
    }
}

/// An explicit, ordered list of named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, Option<String>)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: impl Into<String>, value: impl FieldValue) -> Self {
        self.entries.push((key.into(), value.field_value()));
        self
    }

    /// Collects the top-level fields of a serde record, in declaration order.
    ///
    /// `null` fields are kept with an absent value. Nested arrays and objects
    /// render as their JSON text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, BuildError> {
        let entries = match serde_json::to_value(value)? {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, v.field_value()))
                .collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(BuildError::NotARecord {
                    found: value_kind(&other),
                })
            }
        };
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Fields for FieldSet {
    fn fields(&self) -> Vec<(String, Option<String>)> {
        self.entries.clone()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
