//! Operation table: registration-time validation and request matching.
use std::collections::HashSet;

use gateway_errors::{Failure, FailureResult};
use gateway_schema::{FieldType, ResourceSchema, SchemaRegistry};
use http::Method;
use thiserror::Error;

use crate::operation::{Operation, ParamLocation, ResponseBody};
use crate::path::PathTemplate;

#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("operation '{operation}': invalid path template '{template}': {reason}")]
    InvalidTemplate {
        operation: String,
        template: String,
        reason: String,
    },

    #[error("{method} {first} and {method} {second} can match the same path")]
    Ambiguous {
        method: Method,
        first: String,
        second: String,
    },

    #[error("operation id '{0}' is registered twice")]
    DuplicateOperationId(String),

    #[error("operation '{operation}': path parameter '{name}' {reason}")]
    PathParamMismatch {
        operation: String,
        name: String,
        reason: &'static str,
    },

    #[error("operation '{operation}' references unknown schema '{schema}'")]
    UnknownSchema { operation: String, schema: String },

    #[error("operation '{operation}': '{schema}' is not a list envelope: {reason}")]
    BadEnvelope {
        operation: String,
        schema: String,
        reason: &'static str,
    },
}

struct Entry {
    template: PathTemplate,
    operation: Operation,
}

/// Collects operations; rejects overlaps as they are added.
#[derive(Default)]
pub struct OperationTableBuilder {
    entries: Vec<Entry>,
    ids: HashSet<String>,
}

impl OperationTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, operation: Operation) -> Result<(), RouteTableError> {
        let spec = &operation.spec;
        let template =
            PathTemplate::parse(&spec.path).map_err(|reason| RouteTableError::InvalidTemplate {
                operation: spec.id().to_string(),
                template: spec.path.clone(),
                reason,
            })?;

        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.operation.spec.method == spec.method && e.template.overlaps(&template))
        {
            return Err(RouteTableError::Ambiguous {
                method: spec.method.clone(),
                first: existing.template.to_string(),
                second: template.to_string(),
            });
        }

        if self.ids.contains(spec.id()) {
            return Err(RouteTableError::DuplicateOperationId(spec.id().to_string()));
        }

        let in_template: HashSet<&str> = template.param_names().collect();
        let declared: HashSet<&str> = spec
            .params
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
            .map(|p| p.name.as_str())
            .collect();
        if let Some(name) = in_template.difference(&declared).next() {
            return Err(RouteTableError::PathParamMismatch {
                operation: spec.id().to_string(),
                name: name.to_string(),
                reason: "appears in the template but is not declared",
            });
        }
        if let Some(name) = declared.difference(&in_template).next() {
            return Err(RouteTableError::PathParamMismatch {
                operation: spec.id().to_string(),
                name: name.to_string(),
                reason: "is declared but missing from the template",
            });
        }

        tracing::debug!(
            operation = spec.id(),
            method = %spec.method,
            path = %spec.path,
            "registered operation"
        );
        self.ids.insert(spec.id().to_string());
        self.entries.push(Entry {
            template,
            operation,
        });
        Ok(())
    }

    /// Check every schema reference against `registry` and freeze the table.
    pub fn build(self, registry: &SchemaRegistry) -> Result<OperationTable, RouteTableError> {
        for entry in &self.entries {
            let op = &entry.operation;
            let unknown = |schema: &str| RouteTableError::UnknownSchema {
                operation: op.spec.id().to_string(),
                schema: schema.to_string(),
            };

            if let Some(body) = &op.spec.request_body {
                registry.resolve(&body.schema).map_err(|_| unknown(&body.schema))?;
            }
            match &op.response.body {
                ResponseBody::Resource(schema) => {
                    registry.resolve(schema).map_err(|_| unknown(schema))?;
                }
                ResponseBody::Collection(envelope) => {
                    let schema = registry.resolve(envelope).map_err(|_| unknown(envelope))?;
                    envelope_field(schema).map_err(|reason| RouteTableError::BadEnvelope {
                        operation: op.spec.id().to_string(),
                        schema: envelope.clone(),
                        reason,
                    })?;
                }
                ResponseBody::Empty => {}
            }
        }

        tracing::info!(operations = self.entries.len(), "operation table built");
        Ok(OperationTable {
            entries: self.entries,
        })
    }
}

/// Internal name of the single `list<Resource>` field of an envelope schema.
pub(crate) fn envelope_field(schema: &ResourceSchema) -> Result<&str, &'static str> {
    match schema.fields.as_slice() {
        [field] => match &field.ty {
            FieldType::Sequence(inner) if matches!(**inner, FieldType::Resource(_)) => {
                Ok(&field.internal_name)
            }
            _ => Err("its field is not a list of resources"),
        },
        _ => Err("it must have exactly one field"),
    }
}

/// Immutable after [`OperationTableBuilder::build`].
pub struct OperationTable {
    entries: Vec<Entry>,
}

#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub operation: &'t Operation,
    pub path_values: Vec<(String, String)>,
}

impl OperationTable {
    /// The unique operation for `method` + `path`. No match, including a known
    /// path with another method, is `NotFound`.
    pub fn match_route(&self, method: &Method, path: &str) -> FailureResult<RouteMatch<'_>> {
        self.entries
            .iter()
            .filter(|e| e.operation.spec.method == *method)
            .find_map(|e| {
                e.template.matches(path).map(|path_values| RouteMatch {
                    operation: &e.operation,
                    path_values,
                })
            })
            .ok_or_else(|| Failure::not_found(format!("no route for {method} {path}")))
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().map(|e| &e.operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Outcome;
    use crate::operation::OperationBuilder;
    use crate::params::ParameterSet;
    use gateway_errors::{FailureKind, FailureResult};

    async fn noop(_params: ParameterSet) -> FailureResult<Outcome> {
        Ok(Outcome::Empty)
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_yaml(
            r#"
resources:
  Host:
    fields:
      - { name: name, type: string, required: true }
  HostList:
    fields:
      - { name: hosts, type: 'list<Host>', required: true }
"#,
        )
        .unwrap()
    }

    fn table() -> OperationTable {
        let mut b = OperationTableBuilder::new();
        OperationBuilder::get("/v1/host/{id}")
            .operation_id("host.inspect")
            .path_param("id", "host id")
            .handler(noop)
            .json_response(200, "Host", "host")
            .register(&mut b)
            .unwrap();
        OperationBuilder::get("/v1/hosts")
            .operation_id("hosts.list")
            .handler(noop)
            .collection_response(200, "HostList", "hosts")
            .register(&mut b)
            .unwrap();
        OperationBuilder::delete("/v1/host/{id}")
            .operation_id("host.delete")
            .path_param("id", "host id")
            .handler(noop)
            .empty_response(200, "deleted")
            .register(&mut b)
            .unwrap();
        b.build(&registry()).unwrap()
    }

    #[test]
    fn matches_method_and_template() {
        let t = table();
        let m = t.match_route(&Method::GET, "/v1/host/abc").unwrap();
        assert_eq!(m.operation.spec.id(), "host.inspect");
        assert_eq!(m.path_values, vec![("id".to_string(), "abc".to_string())]);

        let m = t.match_route(&Method::DELETE, "/v1/host/abc/").unwrap();
        assert_eq!(m.operation.spec.id(), "host.delete");
    }

    #[test]
    fn unknown_path_or_method_is_not_found() {
        let t = table();
        let err = t.match_route(&Method::GET, "/v1/unknown").unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
        assert!(!err.message.contains("{id}"));

        let err = t.match_route(&Method::PUT, "/v1/host/abc").unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }

    #[test]
    fn overlapping_templates_are_rejected() {
        let mut b = OperationTableBuilder::new();
        OperationBuilder::get("/v1/host/{id}")
            .path_param("id", "")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap();
        let err = OperationBuilder::get("/v1/host/special")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap_err();
        assert!(matches!(err, RouteTableError::Ambiguous { .. }));

        // Same template under another method is fine.
        OperationBuilder::delete("/v1/host/{id}")
            .path_param("id", "")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap();
    }

    #[test]
    fn path_params_must_match_the_template() {
        let mut b = OperationTableBuilder::new();
        let err = OperationBuilder::get("/v1/host/{id}")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap_err();
        assert!(matches!(err, RouteTableError::PathParamMismatch { .. }));

        let err = OperationBuilder::get("/v1/hosts")
            .path_param("id", "")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap_err();
        assert!(matches!(err, RouteTableError::PathParamMismatch { .. }));
    }

    #[test]
    fn duplicate_operation_ids_are_rejected() {
        let mut b = OperationTableBuilder::new();
        OperationBuilder::get("/v1/a")
            .operation_id("x")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap();
        let err = OperationBuilder::get("/v1/b")
            .operation_id("x")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap_err();
        assert!(matches!(err, RouteTableError::DuplicateOperationId(id) if id == "x"));
    }

    #[test]
    fn build_checks_schema_references() {
        let mut b = OperationTableBuilder::new();
        OperationBuilder::post("/v1/thing")
            .json_request("Thing", "")
            .handler(noop)
            .empty_response(200, "")
            .register(&mut b)
            .unwrap();
        assert!(matches!(
            b.build(&registry()),
            Err(RouteTableError::UnknownSchema { schema, .. }) if schema == "Thing"
        ));

        let mut b = OperationTableBuilder::new();
        OperationBuilder::get("/v1/hosts")
            .handler(noop)
            .collection_response(200, "Host", "")
            .register(&mut b)
            .unwrap();
        assert!(matches!(
            b.build(&registry()),
            Err(RouteTableError::BadEnvelope { .. })
        ));
    }
}
