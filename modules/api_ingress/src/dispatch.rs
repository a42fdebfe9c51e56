use std::sync::Arc;
use std::time::Duration;

use gateway_errors::{Failure, FailureResult};
use gateway_schema::{Marshaller, Resource, SchemaRegistry, Value};
use http::{Method, StatusCode};
use serde_json::Value as Json;

use crate::handler::Outcome;
use crate::operation::{Operation, ResponseBody};
use crate::params::bind_parameters;
use crate::router::{envelope_field, OperationTable};

/// Match → bind → handle → encode, strictly in that order.
pub struct Dispatcher {
    table: Arc<OperationTable>,
    registry: Arc<SchemaRegistry>,
    backend_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        table: Arc<OperationTable>,
        registry: Arc<SchemaRegistry>,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            table,
            registry,
            backend_timeout,
        }
    }

    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> FailureResult<(StatusCode, Json)> {
        let route = self.table.match_route(method, path)?;
        let op = route.operation;
        tracing::debug!(operation = op.spec.id(), %method, path, "dispatching");

        let marshaller = self.registry.marshaller();
        let params = bind_parameters(&op.spec, route.path_values, query, body, &marshaller)?;

        let outcome = tokio::time::timeout(self.backend_timeout, op.handler.handle(params))
            .await
            .map_err(|_| {
                Failure::backend_unavailable(format!(
                    "backend did not answer within {}ms",
                    self.backend_timeout.as_millis()
                ))
            })??;

        let json = encode_outcome(&marshaller, op, outcome)?;
        let status = StatusCode::from_u16(op.response.status)
            .map_err(|e| Failure::internal("operation declares an invalid status").with_cause(e))?;
        Ok((status, json))
    }
}

fn encode_outcome(marshaller: &Marshaller<'_>, op: &Operation, outcome: Outcome) -> FailureResult<Json> {
    match (&op.response.body, outcome) {
        (ResponseBody::Resource(schema), Outcome::Resource(resource)) => {
            marshaller.encode_as(schema, &resource)
        }
        (ResponseBody::Collection(envelope), Outcome::Collection(items)) => {
            let schema = marshaller
                .registry()
                .resolve(envelope)
                .map_err(|e| Failure::internal("envelope schema vanished").with_cause(e))?;
            let field = envelope_field(schema).map_err(Failure::internal)?;
            let wrapped = Resource::new(envelope.as_str()).with(
                field,
                Value::Sequence(items.into_iter().map(Value::Resource).collect()),
            );
            marshaller.encode(&wrapped)
        }
        (ResponseBody::Empty, Outcome::Empty) => Ok(Json::Object(Default::default())),
        (declared, produced) => Err(Failure::internal(format!(
            "operation '{}' declares {declared:?} but the handler produced {}",
            op.spec.id(),
            outcome_name(&produced)
        ))),
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Resource(_) => "a resource",
        Outcome::Collection(_) => "a collection",
        Outcome::Empty => "nothing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationBuilder;
    use crate::params::ParameterSet;
    use crate::router::OperationTableBuilder;
    use gateway_errors::FailureKind;
    use serde_json::json;

    const CONTRACT: &str = r#"
resources:
  Host:
    fields:
      - { name: id, type: string }
      - { name: name, type: string, required: true }
  HostList:
    fields:
      - { name: hosts, type: 'list<Host>', required: true }
"#;

    async fn inspect(params: ParameterSet) -> FailureResult<Outcome> {
        let id = params.required_str("id")?;
        if id == "missing" {
            return Err(Failure::not_found(format!("host '{id}' not found")));
        }
        Ok(Outcome::Resource(
            Resource::new("Host").with("id", id).with("name", "h1"),
        ))
    }

    async fn list(_params: ParameterSet) -> FailureResult<Outcome> {
        Ok(Outcome::Collection(vec![
            Resource::new("Host").with("name", "a"),
            Resource::new("Host").with("name", "b"),
        ]))
    }

    async fn slow(_params: ParameterSet) -> FailureResult<Outcome> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Outcome::Empty)
    }

    async fn wrong_shape(_params: ParameterSet) -> FailureResult<Outcome> {
        Ok(Outcome::Empty)
    }

    fn dispatcher(timeout: Duration) -> Dispatcher {
        let registry = Arc::new(SchemaRegistry::from_yaml(CONTRACT).unwrap());
        let mut b = OperationTableBuilder::new();
        OperationBuilder::get("/v1/host/{id}")
            .path_param("id", "host id")
            .handler(inspect)
            .json_response(200, "Host", "host")
            .register(&mut b)
            .unwrap();
        OperationBuilder::get("/v1/hosts")
            .handler(list)
            .collection_response(200, "HostList", "hosts")
            .register(&mut b)
            .unwrap();
        OperationBuilder::post("/v1/host/{id}/stop")
            .path_param("id", "host id")
            .handler(slow)
            .empty_response(200, "stopped")
            .register(&mut b)
            .unwrap();
        OperationBuilder::get("/v1/broken")
            .handler(wrong_shape)
            .json_response(200, "Host", "host")
            .register(&mut b)
            .unwrap();
        let table = Arc::new(b.build(&registry).unwrap());
        Dispatcher::new(table, registry, timeout)
    }

    #[tokio::test]
    async fn resource_is_encoded_with_declared_status() {
        let d = dispatcher(Duration::from_secs(1));
        let (status, body) = d
            .dispatch(&Method::GET, "/v1/host/abc", None, b"")
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": "abc", "name": "h1"}));
    }

    #[tokio::test]
    async fn collection_is_wrapped_in_envelope() {
        let d = dispatcher(Duration::from_secs(1));
        let (_, body) = d.dispatch(&Method::GET, "/v1/hosts", None, b"").await.unwrap();
        assert_eq!(body, json!({"hosts": [{"name": "a"}, {"name": "b"}]}));
    }

    #[tokio::test]
    async fn handler_failures_pass_through() {
        let d = dispatcher(Duration::from_secs(1));
        let err = d
            .dispatch(&Method::GET, "/v1/host/missing", None, b"")
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let d = dispatcher(Duration::from_secs(1));
        let err = d
            .dispatch(&Method::GET, "/v1/unknown", None, b"")
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn slow_handler_times_out_as_backend_unavailable() {
        let d = dispatcher(Duration::from_millis(100));
        let err = d
            .dispatch(&Method::POST, "/v1/host/abc/stop", None, b"")
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn outcome_shape_mismatch_is_internal() {
        let d = dispatcher(Duration::from_secs(1));
        let err = d
            .dispatch(&Method::GET, "/v1/broken", None, b"")
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Internal);
    }
}
