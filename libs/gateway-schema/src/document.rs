//! YAML contract documents.
//!
//! ```yaml
//! enums:
//!   VolumeSpeed: [COLD, HDD, SSD]
//! resources:
//!   Volume:
//!     description: Block storage volume
//!     fields:
//!       - { name: name, type: string, required: true }
//!       - { name: speed, type: VolumeSpeed }
//!       - { name: mount_path, wire: mountPath, type: string, nullable: true }
//! ```
//!
//! Type expressions are `string`, `integer`, `number`, `boolean`, `list<T>`,
//! `map<T>` or a bare name; bare names listed under `enums` are enum
//! references, all others are resource references.
use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::{RegistryError, SchemaRegistry};
use crate::schema::{EnumDomain, FieldSchema, FieldType, ResourceSchema};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("contract document is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("field '{resource}.{field}': bad type expression '{expr}': {reason}")]
    InvalidType {
        resource: String,
        field: String,
        expr: String,
        reason: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDoc {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    pub name: String,
    /// Wire name when it differs from `name`.
    #[serde(default)]
    pub wire: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl ContractDocument {
    pub fn from_yaml(src: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn into_registry(self) -> Result<SchemaRegistry, DocumentError> {
        let enum_names: BTreeSet<String> = self.enums.keys().cloned().collect();
        let mut builder = SchemaRegistry::builder();

        for (name, values) in self.enums {
            builder.register_enum(EnumDomain::new(name, values))?;
        }

        for (name, doc) in self.resources {
            let mut schema = ResourceSchema::new(&name);
            schema.description = doc.description;
            for f in doc.fields {
                let ty = parse_type(&f.ty, &enum_names).map_err(|reason| {
                    DocumentError::InvalidType {
                        resource: name.clone(),
                        field: f.name.clone(),
                        expr: f.ty.clone(),
                        reason,
                    }
                })?;
                let mut field = FieldSchema::new(f.name, ty);
                if let Some(wire) = f.wire {
                    field = field.wire(wire);
                }
                field.required = f.required;
                field.nullable = f.nullable;
                schema = schema.field(field);
            }
            builder.register(schema)?;
        }

        Ok(builder.build()?)
    }
}

impl SchemaRegistry {
    /// Parse a YAML contract and build the registry in one step.
    pub fn from_yaml(src: &str) -> Result<Self, DocumentError> {
        ContractDocument::from_yaml(src)?.into_registry()
    }
}

fn parse_type(expr: &str, enums: &BTreeSet<String>) -> Result<FieldType, String> {
    let expr = expr.trim();
    match expr {
        "string" => return Ok(FieldType::string()),
        "integer" => return Ok(FieldType::integer()),
        "number" => return Ok(FieldType::number()),
        "boolean" => return Ok(FieldType::boolean()),
        _ => {}
    }

    if let Some(inner) = expr.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
        return Ok(FieldType::list_of(parse_type(inner, enums)?));
    }
    if let Some(inner) = expr.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
        return Ok(FieldType::map_of(parse_type(inner, enums)?));
    }

    let is_name = expr
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_name {
        return Err(format!("cannot parse '{expr}'"));
    }

    if enums.contains(expr) {
        Ok(FieldType::enumeration(expr))
    } else {
        Ok(FieldType::resource(expr))
    }
}
