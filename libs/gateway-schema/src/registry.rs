use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::marshal::Marshaller;
use crate::schema::{EnumDomain, FieldType, ResourceSchema};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("schema or enum '{0}' is already registered")]
    DuplicateSchema(String),

    #[error("schema '{schema}' declares {which} name '{name}' more than once")]
    DuplicateField {
        schema: String,
        name: String,
        which: &'static str,
    },

    #[error("enum '{0}' has no values")]
    EmptyEnum(String),

    #[error("enum '{domain}' lists '{value}' more than once")]
    DuplicateEnumValue { domain: String, value: String },

    #[error("field '{schema}.{field}' references unknown type '{target}'")]
    UnresolvedReference {
        schema: String,
        field: String,
        target: String,
    },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("unknown enum '{0}'")]
    UnknownEnum(String),
}

/// First pass: collect every schema and enum by name.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: BTreeMap<String, ResourceSchema>,
    enums: BTreeMap<String, EnumDomain>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ResourceSchema) -> Result<&mut Self, RegistryError> {
        self.ensure_free(&schema.name)?;

        let mut wire = HashSet::new();
        let mut internal = HashSet::new();
        for field in &schema.fields {
            if !wire.insert(field.wire_name.as_str()) {
                return Err(RegistryError::DuplicateField {
                    schema: schema.name.clone(),
                    name: field.wire_name.clone(),
                    which: "wire",
                });
            }
            if !internal.insert(field.internal_name.as_str()) {
                return Err(RegistryError::DuplicateField {
                    schema: schema.name.clone(),
                    name: field.internal_name.clone(),
                    which: "internal",
                });
            }
        }

        self.schemas.insert(schema.name.clone(), schema);
        Ok(self)
    }

    pub fn register_enum(&mut self, domain: EnumDomain) -> Result<&mut Self, RegistryError> {
        self.ensure_free(&domain.name)?;
        if domain.values.is_empty() {
            return Err(RegistryError::EmptyEnum(domain.name));
        }
        let mut seen = HashSet::new();
        for value in &domain.values {
            if !seen.insert(value.as_str()) {
                return Err(RegistryError::DuplicateEnumValue {
                    domain: domain.name.clone(),
                    value: value.clone(),
                });
            }
        }
        self.enums.insert(domain.name.clone(), domain);
        Ok(self)
    }

    fn ensure_free(&self, name: &str) -> Result<(), RegistryError> {
        if self.schemas.contains_key(name) || self.enums.contains_key(name) {
            return Err(RegistryError::DuplicateSchema(name.to_string()));
        }
        Ok(())
    }

    /// Second pass: every nested reference must name a registered schema or enum
    /// of the matching kind.
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        for schema in self.schemas.values() {
            for field in &schema.fields {
                let resolved = match field.ty.innermost() {
                    FieldType::Enum(target) => self.enums.contains_key(target).then_some(()).ok_or(target),
                    FieldType::Resource(target) => {
                        self.schemas.contains_key(target).then_some(()).ok_or(target)
                    }
                    _ => Ok(()),
                };
                if let Err(target) = resolved {
                    return Err(RegistryError::UnresolvedReference {
                        schema: schema.name.clone(),
                        field: field.internal_name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            schemas = self.schemas.len(),
            enums = self.enums.len(),
            "schema registry built"
        );

        Ok(SchemaRegistry {
            schemas: self.schemas,
            enums: self.enums,
        })
    }
}

/// Immutable after [`SchemaRegistryBuilder::build`]; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, ResourceSchema>,
    enums: BTreeMap<String, EnumDomain>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    pub fn resolve(&self, name: &str) -> Result<&ResourceSchema, RegistryError> {
        self.schemas
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSchema(name.to_string()))
    }

    pub fn enum_domain(&self, name: &str) -> Result<&EnumDomain, RegistryError> {
        self.enums
            .get(name)
            .ok_or_else(|| RegistryError::UnknownEnum(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Schemas in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDomain> {
        self.enums.values()
    }

    pub fn marshaller(&self) -> Marshaller<'_> {
        Marshaller::new(self)
    }
}
