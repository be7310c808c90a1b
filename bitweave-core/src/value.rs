use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::TypeTag;

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// The most specific tag this value carries on its own.
    ///
    /// Integers report their value kind only; the width-specific tag belongs
    /// to the codec that produced them.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::BOOL,
            Value::Int(_) => TypeTag::from_static("int"),
            Value::UInt(_) => TypeTag::from_static("uint"),
            Value::List(_) => TypeTag::LIST,
            Value::Record(record) => record.type_tag().clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of the value; `None` for non-integers or a `UInt` beyond `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// A decoded record: a type tag plus fields in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    type_tag: TypeTag,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_tag: TypeTag) -> Self {
        Record {
            type_tag,
            fields: IndexMap::new(),
        }
    }

    /// Builds a record from `(name, value)` pairs, preserving their order.
    pub fn with_fields(
        type_tag: TypeTag,
        fields: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        Record {
            type_tag,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
