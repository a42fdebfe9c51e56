//! Internal representation of decoded payloads.
use std::collections::BTreeMap;

use crate::schema::ResourceSchema;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null, distinct from an unset field.
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// A member of an enum domain.
    Enum(String),
    Resource(Resource),
    Sequence(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn enumeration(value: impl Into<String>) -> Self {
        Value::Enum(value.into())
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Resource(_) => "resource",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    /// String contents of a `String` or `Enum` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Value::Resource(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

/// A value tree tagged with its schema name, keyed by internal field names.
///
/// A field that is absent here is "unset"; a field set to [`Value::Null`] is an
/// explicit null. The two encode differently.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    kind: String,
    fields: BTreeMap<String, Value>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
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

    /// Copy of this resource re-tagged as `target`, keeping only the fields
    /// `target` declares. Used when a request schema feeds a response schema.
    pub fn project(&self, target: &ResourceSchema) -> Resource {
        let fields = target
            .fields
            .iter()
            .filter_map(|f| {
                self.fields
                    .get(&f.internal_name)
                    .map(|v| (f.internal_name.clone(), v.clone()))
            })
            .collect();
        Resource {
            kind: target.name.clone(),
            fields,
        }
    }
}
