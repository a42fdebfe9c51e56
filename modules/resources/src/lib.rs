//! v1 resource endpoints of the gateway.
//!
//! `contract` defines what the gateway needs from the orchestration engine,
//! `gateways` implements it (in memory or over HTTP) and `api::rest` turns it
//! into operations for the ingress.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_ingress::{OperationTable, OperationTableBuilder};
use gateway_schema::{DocumentError, SchemaRegistry};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod contract;
pub mod gateways;

pub use api::rest::handlers::HandlerCtx;
pub use contract::{BackendError, OrchestrationClient, ResourceKind};
pub use gateways::{HttpOrchestrationClient, InMemoryOrchestrator};

/// The v1 contract document shipped with the gateway.
pub const CONTRACT_V1: &str = include_str!("../contract/v1.yaml");

pub fn contract_registry() -> Result<SchemaRegistry, DocumentError> {
    SchemaRegistry::from_yaml(CONTRACT_V1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Http,
}

/// `modules.resources` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Base URL of the orchestration engine; required for the `http` backend.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            endpoint: None,
            request_timeout: default_request_timeout(),
        }
    }
}

/// Orchestration client selected by `cfg`.
pub fn build_client(
    cfg: &ResourcesConfig,
    registry: Arc<SchemaRegistry>,
) -> anyhow::Result<Arc<dyn OrchestrationClient>> {
    match cfg.backend {
        BackendKind::Memory => {
            tracing::info!("using the in-memory orchestration backend");
            Ok(Arc::new(InMemoryOrchestrator::new(registry)))
        }
        BackendKind::Http => {
            let endpoint = cfg
                .endpoint
                .as_deref()
                .context("modules.resources.endpoint is required for the http backend")?;
            tracing::info!(endpoint, "using the HTTP orchestration backend");
            Ok(Arc::new(HttpOrchestrationClient::new(
                endpoint,
                cfg.request_timeout,
                registry,
            )?))
        }
    }
}

/// The complete, validated v1 operation table.
pub fn build_operation_table(
    registry: Arc<SchemaRegistry>,
    client: Arc<dyn OrchestrationClient>,
) -> anyhow::Result<OperationTable> {
    let ctx = Arc::new(HandlerCtx::new(client, registry.clone()));
    let mut table = OperationTableBuilder::new();
    api::rest::routes::register_routes(&mut table, ctx).context("registering v1 routes")?;
    table
        .build(&registry)
        .context("validating the v1 operation table")
}
