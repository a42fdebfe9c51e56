use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
        }
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Primitive(Primitive),
    /// Name of a registered enum domain.
    Enum(String),
    /// Name of a registered resource schema.
    Resource(String),
    Sequence(Box<FieldType>),
    /// String-keyed map.
    Map(Box<FieldType>),
}

impl FieldType {
    pub fn string() -> Self {
        FieldType::Primitive(Primitive::String)
    }

    pub fn integer() -> Self {
        FieldType::Primitive(Primitive::Integer)
    }

    pub fn number() -> Self {
        FieldType::Primitive(Primitive::Number)
    }

    pub fn boolean() -> Self {
        FieldType::Primitive(Primitive::Boolean)
    }

    pub fn enumeration(domain: impl Into<String>) -> Self {
        FieldType::Enum(domain.into())
    }

    pub fn resource(schema: impl Into<String>) -> Self {
        FieldType::Resource(schema.into())
    }

    pub fn list_of(item: FieldType) -> Self {
        FieldType::Sequence(Box::new(item))
    }

    pub fn map_of(value: FieldType) -> Self {
        FieldType::Map(Box::new(value))
    }

    /// Element type after peeling off every sequence/map layer.
    pub fn innermost(&self) -> &FieldType {
        match self {
            FieldType::Sequence(inner) | FieldType::Map(inner) => inner.innermost(),
            other => other,
        }
    }

    /// JSON-level description used in type mismatch messages.
    pub fn expected(&self) -> String {
        match self {
            FieldType::Primitive(p) => p.as_str().to_string(),
            FieldType::Enum(domain) => format!("string ({domain})"),
            FieldType::Resource(schema) => format!("object ({schema})"),
            FieldType::Sequence(_) => "array".to_string(),
            FieldType::Map(_) => "object".to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(p) => f.write_str(p.as_str()),
            FieldType::Enum(name) | FieldType::Resource(name) => f.write_str(name),
            FieldType::Sequence(inner) => write!(f, "list<{inner}>"),
            FieldType::Map(inner) => write!(f, "map<{inner}>"),
        }
    }
}

/// One entry of a resource's attribute map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub wire_name: String,
    pub internal_name: String,
    pub ty: FieldType,
    pub required: bool,
    pub nullable: bool,
}

impl FieldSchema {
    /// Field whose wire name equals its internal name; use [`FieldSchema::wire`] to diverge.
    pub fn new(internal_name: impl Into<String>, ty: FieldType) -> Self {
        let internal_name = internal_name.into();
        Self {
            wire_name: internal_name.clone(),
            internal_name,
            ty,
            required: false,
            nullable: false,
        }
    }

    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub name: String,
    pub description: Option<String>,
    /// Ordered; decode reports the first failing field in this order.
    pub fields: Vec<FieldSchema>,
}

impl ResourceSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn by_internal(&self, internal_name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.internal_name == internal_name)
    }
}

/// Closed set of string values a field may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDomain {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDomain {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}
