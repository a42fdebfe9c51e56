use async_trait::async_trait;
use gateway_schema::Resource;

use crate::contract::error::BackendResult;
use crate::contract::model::{HostAction, ListFilter, ResourceKind, ResourceRef};

/// The orchestration engine as seen by the gateway.
///
/// Resources crossing this boundary are tagged with the schema of their kind:
/// [`ResourceKind::request_schema`] for `create`, [`ResourceKind::schema`] for
/// everything returned.
#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Create a resource and return its backend id.
    async fn create(&self, kind: ResourceKind, spec: Resource) -> BackendResult<String>;

    async fn list(&self, kind: ResourceKind, filter: &ListFilter) -> BackendResult<Vec<ResourceRef>>;

    /// `id` may also be the resource name.
    async fn inspect(&self, kind: ResourceKind, id: &str) -> BackendResult<Resource>;

    /// `tenant` restricts the lookup to resources owned by that tenant.
    async fn delete(&self, kind: ResourceKind, id: &str, tenant: Option<&str>) -> BackendResult<()>;

    async fn act(&self, kind: ResourceKind, id: &str, action: HostAction) -> BackendResult<Resource>;

    async fn ssh_config(&self, host: &str) -> BackendResult<Resource>;

    async fn current_tenant(&self) -> BackendResult<Resource>;

    async fn set_current_tenant(&self, name: &str) -> BackendResult<Resource>;
}
