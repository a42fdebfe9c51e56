//! OpenAPI 3 document generated from the operation table and the schema registry.
use std::collections::{BTreeMap, BTreeSet};

use gateway_errors::FailureKind;
use gateway_schema::{FieldType, ResourceSchema, SchemaRegistry};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::operation::{Operation, ParamLocation, ResponseBody};
use crate::router::OperationTable;

pub const ERROR_BODY_SCHEMA: &str = "ErrorBody";

#[derive(Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Value>,
    pub paths: BTreeMap<String, BTreeMap<String, Value>>,
    pub components: OpenApiComponents,
}

#[derive(Serialize)]
pub struct OpenApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Default)]
pub struct OpenApiComponents {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
}

impl OpenApiComponents {
    /// One component per resource schema and enum domain, plus the error body.
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        let mut schemas = BTreeMap::new();
        for schema in registry.schemas() {
            schemas.insert(schema.name.clone(), resource_schema(schema));
        }
        for domain in registry.enums() {
            schemas.insert(
                domain.name.clone(),
                json!({ "type": "string", "enum": domain.values }),
            );
        }
        schemas.insert(
            ERROR_BODY_SCHEMA.to_string(),
            json!({
                "type": "object",
                "required": ["kind", "message"],
                "properties": {
                    "kind": {
                        "type": "string",
                        "enum": FailureKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>()
                    },
                    "message": { "type": "string" },
                    "request_id": { "type": "string" }
                }
            }),
        );
        Self { schemas }
    }
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn field_type_schema(ty: &FieldType) -> Value {
    match ty {
        FieldType::Primitive(p) => json!({ "type": p.as_str() }),
        FieldType::Enum(name) | FieldType::Resource(name) => schema_ref(name),
        FieldType::Sequence(inner) => json!({ "type": "array", "items": field_type_schema(inner) }),
        FieldType::Map(inner) => {
            json!({ "type": "object", "additionalProperties": field_type_schema(inner) })
        }
    }
}

fn resource_schema(schema: &ResourceSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &schema.fields {
        let mut prop = field_type_schema(&field.ty);
        if field.nullable {
            // $ref siblings are ignored in 3.0, so wrap before marking nullable.
            if prop.get("$ref").is_some() {
                prop = json!({ "allOf": [prop] });
            }
            if let Some(obj) = prop.as_object_mut() {
                obj.insert("nullable".into(), Value::Bool(true));
            }
        }
        properties.insert(field.wire_name.clone(), prop);
        if field.required {
            required.push(Value::String(field.wire_name.clone()));
        }
    }

    let mut out = Map::new();
    out.insert("type".into(), json!("object"));
    if let Some(desc) = &schema.description {
        out.insert("description".into(), json!(desc));
    }
    if !required.is_empty() {
        out.insert("required".into(), Value::Array(required));
    }
    out.insert("properties".into(), Value::Object(properties));
    Value::Object(out)
}

/// Failure kinds an operation can answer with: its declared ones plus what the
/// gateway itself produces while binding, dispatching and encoding.
fn failure_kinds(op: &Operation) -> BTreeSet<FailureKind> {
    let mut kinds: BTreeSet<FailureKind> = op.spec.failures.iter().copied().collect();
    kinds.insert(FailureKind::BackendUnavailable);
    kinds.insert(FailureKind::Internal);
    if op.spec.params.iter().any(|p| p.location == ParamLocation::Query) {
        kinds.insert(FailureKind::InvalidParameter);
    }
    if op
        .spec
        .params
        .iter()
        .any(|p| p.location == ParamLocation::Query && p.required)
    {
        kinds.insert(FailureKind::MissingParameter);
    }
    if op.spec.request_body.is_some() {
        kinds.extend([
            FailureKind::MissingParameter,
            FailureKind::InvalidParameter,
            FailureKind::MissingField,
            FailureKind::TypeMismatch,
            FailureKind::InvalidEnumValue,
        ]);
    }
    kinds
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn operation_object(op: &Operation) -> Value {
    let spec = &op.spec;
    let mut obj = Map::new();
    obj.insert("operationId".into(), json!(spec.id()));
    if let Some(s) = &spec.summary {
        obj.insert("summary".into(), json!(s));
    }
    if let Some(d) = &spec.description {
        obj.insert("description".into(), json!(d));
    }
    if !spec.tags.is_empty() {
        obj.insert("tags".into(), json!(spec.tags));
    }

    if !spec.params.is_empty() {
        let params: Vec<Value> = spec
            .params
            .iter()
            .map(|p| {
                let mut param = Map::new();
                param.insert("name".into(), json!(p.name));
                param.insert("in".into(), json!(p.location.as_str()));
                param.insert(
                    "required".into(),
                    json!(p.location == ParamLocation::Path || p.required),
                );
                if let Some(d) = &p.description {
                    param.insert("description".into(), json!(d));
                }
                param.insert("schema".into(), json!({ "type": p.kind.as_str() }));
                Value::Object(param)
            })
            .collect();
        obj.insert("parameters".into(), Value::Array(params));
    }

    if let Some(body) = &spec.request_body {
        let mut rb = Map::new();
        rb.insert("required".into(), json!(true));
        if let Some(d) = &body.description {
            rb.insert("description".into(), json!(d));
        }
        rb.insert("content".into(), json_content(schema_ref(&body.schema)));
        obj.insert("requestBody".into(), Value::Object(rb));
    }

    let mut responses = Map::new();
    let success = match &op.response.body {
        ResponseBody::Resource(schema) | ResponseBody::Collection(schema) => json!({
            "description": op.response.description,
            "content": json_content(schema_ref(schema)),
        }),
        ResponseBody::Empty => json!({
            "description": op.response.description,
            "content": json_content(json!({ "type": "object" })),
        }),
    };
    responses.insert(op.response.status.to_string(), success);

    let mut by_status: BTreeMap<u16, Vec<&'static str>> = BTreeMap::new();
    for kind in failure_kinds(op) {
        by_status.entry(kind.status()).or_default().push(kind.as_str());
    }
    for (status, codes) in by_status {
        responses.insert(
            status.to_string(),
            json!({
                "description": codes.join(" | "),
                "content": json_content(schema_ref(ERROR_BODY_SCHEMA)),
            }),
        );
    }
    obj.insert("responses".into(), Value::Object(responses));
    Value::Object(obj)
}

/// Build the document; `base_path` is advertised as the single server url.
pub fn build_openapi(
    table: &OperationTable,
    registry: &SchemaRegistry,
    base_path: Option<&str>,
) -> OpenApi {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for op in table.operations() {
        paths
            .entry(op.spec.path.clone())
            .or_default()
            .insert(op.spec.method.as_str().to_lowercase(), operation_object(op));
    }

    OpenApi {
        openapi: "3.0.3",
        info: OpenApiInfo {
            title: "Cloud Gateway API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Schema-driven REST gateway for cloud resources".to_string()),
        },
        servers: base_path
            .map(|p| vec![json!({ "url": p })])
            .unwrap_or_default(),
        paths,
        components: OpenApiComponents::from_registry(registry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Outcome;
    use crate::operation::{OperationBuilder, ParamKind};
    use crate::params::ParameterSet;
    use crate::router::OperationTableBuilder;
    use gateway_errors::FailureResult;

    async fn noop(_params: ParameterSet) -> FailureResult<Outcome> {
        Ok(Outcome::Empty)
    }

    fn fixture() -> (OperationTable, SchemaRegistry) {
        let registry = SchemaRegistry::from_yaml(
            r#"
enums:
  DiskSpeed: [HDD, SSD]
resources:
  Volume:
    description: block volume
    fields:
      - { name: size, type: integer, required: true }
      - { name: speed, type: DiskSpeed }
      - { name: mount_path, wire: mountPath, type: string, nullable: true }
  VolumeList:
    fields:
      - { name: volumes, type: 'list<Volume>', required: true }
"#,
        )
        .unwrap();
        let mut b = OperationTableBuilder::new();
        OperationBuilder::post("/v1/volume")
            .operation_id("volume.create")
            .tag("volumes")
            .json_request("Volume", "volume to create")
            .fails_with(FailureKind::Conflict)
            .handler(noop)
            .json_response(200, "Volume", "created volume")
            .register(&mut b)
            .unwrap();
        OperationBuilder::get("/v1/volumes")
            .query_param("all", ParamKind::Boolean, false, "include detached")
            .handler(noop)
            .collection_response(200, "VolumeList", "volumes")
            .register(&mut b)
            .unwrap();
        OperationBuilder::delete("/v1/volume/{id}")
            .path_param("id", "volume id")
            .handler(noop)
            .empty_response(200, "deleted")
            .register(&mut b)
            .unwrap();
        (b.build(&registry).unwrap(), registry)
    }

    #[test]
    fn components_use_wire_names_and_refs() {
        let (table, registry) = fixture();
        let doc = serde_json::to_value(build_openapi(&table, &registry, None)).unwrap();
        let volume = &doc["components"]["schemas"]["Volume"];

        assert_eq!(volume["required"], json!(["size"]));
        assert_eq!(volume["properties"]["size"]["type"], "integer");
        assert_eq!(
            volume["properties"]["speed"]["$ref"],
            "#/components/schemas/DiskSpeed"
        );
        assert_eq!(volume["properties"]["mountPath"]["nullable"], true);
        assert!(volume["properties"].get("mount_path").is_none());
        assert_eq!(
            doc["components"]["schemas"]["DiskSpeed"]["enum"],
            json!(["HDD", "SSD"])
        );
        assert!(doc["components"]["schemas"][ERROR_BODY_SCHEMA].is_object());
    }

    #[test]
    fn operations_list_parameters_and_failure_responses() {
        let (table, registry) = fixture();
        let doc = serde_json::to_value(build_openapi(&table, &registry, Some("/api"))).unwrap();
        assert_eq!(doc["servers"][0]["url"], "/api");

        let create = &doc["paths"]["/v1/volume"]["post"];
        assert_eq!(create["operationId"], "volume.create");
        assert_eq!(
            create["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Volume"
        );
        let bad_request = create["responses"]["400"]["description"].as_str().unwrap();
        assert!(bad_request.contains("MissingField"));
        assert!(bad_request.contains("InvalidEnumValue"));
        assert!(create["responses"]["409"].is_object());
        assert!(create["responses"]["503"].is_object());

        let list = &doc["paths"]["/v1/volumes"]["get"];
        assert_eq!(list["parameters"][0]["in"], "query");
        assert_eq!(list["parameters"][0]["required"], false);
        assert_eq!(list["parameters"][0]["schema"]["type"], "boolean");
        assert!(list["responses"]["409"].is_null());

        let delete = &doc["paths"]["/v1/volume/{id}"]["delete"];
        assert_eq!(delete["parameters"][0]["required"], true);
        assert_eq!(delete["responses"]["200"]["content"]["application/json"]["schema"]["type"], "object");
    }
}
