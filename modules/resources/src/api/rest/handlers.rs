//! Generic operation handlers, one per operation shape.
use std::sync::Arc;

use api_ingress::{OperationHandler, Outcome, ParameterSet};
use async_trait::async_trait;
use gateway_errors::{Failure, FailureResult};
use gateway_schema::{Resource, ResourceSchema, SchemaRegistry};

use crate::contract::{HostAction, ListFilter, OrchestrationClient, ResourceKind, ResourceRef};

/// Shared, read-only state every handler needs.
pub struct HandlerCtx {
    client: Arc<dyn OrchestrationClient>,
    registry: Arc<SchemaRegistry>,
}

impl HandlerCtx {
    pub fn new(client: Arc<dyn OrchestrationClient>, registry: Arc<SchemaRegistry>) -> Self {
        Self { client, registry }
    }

    fn schema(&self, name: &str) -> FailureResult<&ResourceSchema> {
        self.registry
            .resolve(name)
            .map_err(|e| Failure::internal(format!("schema '{name}' is not registered")).with_cause(e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Create(ResourceKind),
    List(ResourceKind),
    Inspect(ResourceKind),
    Delete(ResourceKind),
    HostAction(HostAction),
    HostSsh,
    HostSecurityGroups,
    CurrentTenant,
    SelectTenant,
}

pub struct ResourceHandler {
    shape: Shape,
    ctx: Arc<HandlerCtx>,
}

impl ResourceHandler {
    pub fn new(shape: Shape, ctx: Arc<HandlerCtx>) -> Self {
        Self { shape, ctx }
    }

    /// Listing result as items of `schema`: only the reference fields it declares are set.
    fn items(&self, kind: ResourceKind, refs: Vec<ResourceRef>) -> FailureResult<Outcome> {
        let schema = self.ctx.schema(kind.schema())?;
        let has = |field: &str| schema.by_internal(field).is_some();
        let items = refs
            .into_iter()
            .map(|r| {
                let mut item = Resource::new(schema.name.as_str());
                if has("id") {
                    item.set("id", r.id);
                }
                if has("name") {
                    item.set("name", r.name);
                }
                item
            })
            .collect();
        Ok(Outcome::Collection(items))
    }
}

fn filter_from(params: &ParameterSet) -> ListFilter {
    ListFilter {
        all: params.bool("all").unwrap_or(false),
        tenant_id: params.str("tenant_id").map(str::to_string),
        host: None,
    }
}

#[async_trait]
impl OperationHandler for ResourceHandler {
    async fn handle(&self, mut params: ParameterSet) -> FailureResult<Outcome> {
        let client = &self.ctx.client;
        match self.shape {
            Shape::Create(kind) => {
                let spec = params.take_body()?;
                let id = client.create(kind, spec.clone()).await?;
                tracing::info!(%kind, %id, name = spec.str_field("name").unwrap_or_default(), "resource created");
                let schema = self.ctx.schema(kind.schema())?;
                Ok(Outcome::Resource(spec.project(schema).with("id", id)))
            }
            Shape::List(kind) => {
                let refs = client.list(kind, &filter_from(&params)).await?;
                self.items(kind, refs)
            }
            Shape::Inspect(kind) => {
                let id = params.required_str("id")?;
                Ok(Outcome::Resource(client.inspect(kind, id).await?))
            }
            Shape::Delete(kind) => {
                // An explicit name wins over the path id.
                let id = params.required_str("id")?;
                let target = params.str("name").unwrap_or(id);
                client.delete(kind, target, params.str("tenant_id")).await?;
                tracing::info!(%kind, id = %target, "resource deleted");
                Ok(Outcome::Empty)
            }
            Shape::HostAction(action) => {
                let id = params.required_str("id")?;
                let host = client.act(ResourceKind::Host, id, action).await?;
                Ok(Outcome::Resource(host))
            }
            Shape::HostSsh => {
                let id = params.required_str("id")?;
                Ok(Outcome::Resource(client.ssh_config(id).await?))
            }
            Shape::HostSecurityGroups => {
                let filter = ListFilter {
                    host: Some(params.required_str("id")?.to_string()),
                    ..filter_from(&params)
                };
                let refs = client.list(ResourceKind::SecurityGroup, &filter).await?;
                self.items(ResourceKind::SecurityGroup, refs)
            }
            Shape::CurrentTenant => Ok(Outcome::Resource(client.current_tenant().await?)),
            Shape::SelectTenant => {
                let name = params.required_str("name")?;
                Ok(Outcome::Resource(client.set_current_tenant(name).await?))
            }
        }
    }
}
