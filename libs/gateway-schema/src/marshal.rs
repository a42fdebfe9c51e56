//! Wire JSON <-> [`Resource`] conversion driven by the registry's field tables.
use std::collections::BTreeMap;

use gateway_errors::{Failure, FailureResult};
use serde_json::{Map, Value as Json};

use crate::registry::{RegistryError, SchemaRegistry};
use crate::schema::{FieldType, Primitive, ResourceSchema};
use crate::value::{Resource, Value};

/// Decodes request payloads and encodes response resources.
///
/// Decode failures are client errors naming the offending field path
/// (`masters[2].name`); encode failures are always `Internal`, since a resource
/// that does not satisfy its own schema is a server bug.
#[derive(Debug, Clone, Copy)]
pub struct Marshaller<'r> {
    registry: &'r SchemaRegistry,
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn child_path(prefix: &str, wire_name: &str) -> String {
    if prefix.is_empty() {
        wire_name.to_string()
    } else {
        format!("{prefix}.{wire_name}")
    }
}

fn registry_bug(err: RegistryError) -> Failure {
    Failure::internal("schema registry lookup failed").with_cause(err)
}

impl<'r> Marshaller<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Decode `wire` against schema `schema`. Unknown wire fields are ignored.
    pub fn decode(&self, schema: &str, wire: &Json) -> FailureResult<Resource> {
        let schema = self.registry.resolve(schema).map_err(registry_bug)?;
        match wire {
            Json::Object(map) => self.decode_object(schema, map, ""),
            other => Err(Failure::type_mismatch(
                "body",
                FieldType::resource(&schema.name).expected(),
                json_kind(other),
            )),
        }
    }

    fn decode_object(
        &self,
        schema: &ResourceSchema,
        map: &Map<String, Json>,
        prefix: &str,
    ) -> FailureResult<Resource> {
        let mut out = Resource::new(&schema.name);
        for field in &schema.fields {
            let path = child_path(prefix, &field.wire_name);
            match map.get(&field.wire_name) {
                None if field.required => return Err(Failure::missing_field(path)),
                None => {}
                Some(Json::Null) if field.nullable => out.set(&field.internal_name, Value::Null),
                Some(Json::Null) => {
                    return Err(Failure::type_mismatch(path, field.ty.expected(), "null"))
                }
                Some(v) => {
                    let value = self.decode_value(&field.ty, v, &path)?;
                    out.set(&field.internal_name, value);
                }
            }
        }
        Ok(out)
    }

    fn decode_value(&self, ty: &FieldType, v: &Json, path: &str) -> FailureResult<Value> {
        let value = match (ty, v) {
            (FieldType::Primitive(Primitive::String), Json::String(s)) => Value::String(s.clone()),
            (FieldType::Primitive(Primitive::Integer), Json::Number(n)) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| Failure::type_mismatch(path, "integer", "number"))?,
            (FieldType::Primitive(Primitive::Number), Json::Number(n)) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| Failure::type_mismatch(path, "number", "number out of range"))?,
            (FieldType::Primitive(Primitive::Boolean), Json::Bool(b)) => Value::Bool(*b),
            (FieldType::Enum(domain), Json::String(s)) => {
                let domain = self.registry.enum_domain(domain).map_err(registry_bug)?;
                if !domain.contains(s) {
                    return Err(Failure::invalid_enum_value(path, s, &domain.values));
                }
                Value::Enum(s.clone())
            }
            (FieldType::Resource(name), Json::Object(map)) => {
                let schema = self.registry.resolve(name).map_err(registry_bug)?;
                Value::Resource(self.decode_object(schema, map, path)?)
            }
            (FieldType::Sequence(item), Json::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    out.push(self.decode_element(item, element, &format!("{path}[{i}]"))?);
                }
                Value::Sequence(out)
            }
            (FieldType::Map(item), Json::Object(entries)) => {
                let mut out = BTreeMap::new();
                for (key, element) in entries {
                    let value = self.decode_element(item, element, &format!("{path}[{key}]"))?;
                    out.insert(key.clone(), value);
                }
                Value::Map(out)
            }
            (ty, other) => return Err(Failure::type_mismatch(path, ty.expected(), json_kind(other))),
        };
        Ok(value)
    }

    // Container elements are never nullable.
    fn decode_element(&self, ty: &FieldType, v: &Json, path: &str) -> FailureResult<Value> {
        if v.is_null() {
            return Err(Failure::type_mismatch(path, ty.expected(), "null"));
        }
        self.decode_value(ty, v, path)
    }

    /// Encode `resource` using its own schema. Unset fields are omitted; explicit
    /// nulls are emitted as JSON null.
    pub fn encode(&self, resource: &Resource) -> FailureResult<Json> {
        let schema = self.registry.resolve(resource.kind()).map_err(registry_bug)?;
        self.encode_object(schema, resource, "")
    }

    /// Encode `resource`, insisting that it is tagged with `schema`.
    pub fn encode_as(&self, schema: &str, resource: &Resource) -> FailureResult<Json> {
        if resource.kind() != schema {
            return Err(Failure::internal(format!(
                "expected a {schema} resource, handler produced {}",
                resource.kind()
            )));
        }
        self.encode(resource)
    }

    fn encode_object(
        &self,
        schema: &ResourceSchema,
        resource: &Resource,
        prefix: &str,
    ) -> FailureResult<Json> {
        if resource.kind() != schema.name {
            return Err(Failure::internal(format!(
                "field '{prefix}': expected a {} resource, found {}",
                schema.name,
                resource.kind()
            )));
        }

        if let Some((name, _)) = resource.fields().find(|(n, _)| schema.by_internal(n).is_none()) {
            return Err(Failure::internal(format!(
                "resource {} carries undeclared field '{name}'",
                schema.name
            )));
        }

        let mut map = Map::new();
        for field in &schema.fields {
            let path = child_path(prefix, &field.wire_name);
            match resource.get(&field.internal_name) {
                None if field.required => {
                    return Err(Failure::internal(format!(
                        "required field '{path}' of {} is unset",
                        schema.name
                    )))
                }
                None => {}
                Some(Value::Null) if field.nullable => {
                    map.insert(field.wire_name.clone(), Json::Null);
                }
                Some(Value::Null) => {
                    return Err(Failure::internal(format!(
                        "field '{path}' of {} is not nullable",
                        schema.name
                    )))
                }
                Some(v) => {
                    map.insert(field.wire_name.clone(), self.encode_value(&field.ty, v, &path)?);
                }
            }
        }
        Ok(Json::Object(map))
    }

    fn encode_value(&self, ty: &FieldType, v: &Value, path: &str) -> FailureResult<Json> {
        let json = match (ty, v) {
            (FieldType::Primitive(Primitive::String), Value::String(s)) => Json::String(s.clone()),
            (FieldType::Primitive(Primitive::Integer), Value::Integer(i)) => Json::from(*i),
            (FieldType::Primitive(Primitive::Number), Value::Number(f)) => {
                serde_json::Number::from_f64(*f)
                    .map(Json::Number)
                    .ok_or_else(|| Failure::internal(format!("field '{path}': non-finite number")))?
            }
            (FieldType::Primitive(Primitive::Boolean), Value::Bool(b)) => Json::Bool(*b),
            (FieldType::Enum(domain), Value::Enum(s)) => {
                let domain = self.registry.enum_domain(domain).map_err(registry_bug)?;
                if !domain.contains(s) {
                    return Err(Failure::internal(format!(
                        "field '{path}': '{s}' is outside enum {}",
                        domain.name
                    )));
                }
                Json::String(s.clone())
            }
            (FieldType::Resource(name), Value::Resource(r)) => {
                let schema = self.registry.resolve(name).map_err(registry_bug)?;
                self.encode_object(schema, r, path)?
            }
            (FieldType::Sequence(item), Value::Sequence(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    out.push(self.encode_element(item, element, &format!("{path}[{i}]"))?);
                }
                Json::Array(out)
            }
            (FieldType::Map(item), Value::Map(entries)) => {
                let mut out = Map::new();
                for (key, element) in entries {
                    let json = self.encode_element(item, element, &format!("{path}[{key}]"))?;
                    out.insert(key.clone(), json);
                }
                Json::Object(out)
            }
            (ty, v) => {
                return Err(Failure::internal(format!(
                    "field '{path}': cannot encode {} as {ty}",
                    v.variant_name()
                )))
            }
        };
        Ok(json)
    }

    fn encode_element(&self, ty: &FieldType, v: &Value, path: &str) -> FailureResult<Json> {
        if v.is_null() {
            return Err(Failure::internal(format!("field '{path}': null element")));
        }
        self.encode_value(ty, v, path)
    }
}
