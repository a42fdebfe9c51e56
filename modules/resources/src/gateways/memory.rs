//! Deterministic in-process orchestration backend.
//!
//! Ids are sequential per process (`host-0001`, `volume-0002`, ...), names are
//! unique per kind and tenant, and every tenant starts with a `default`
//! security group that new hosts are bound to. Images are shared by all tenants.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_schema::{Resource, SchemaRegistry, Value};
use parking_lot::Mutex;

use crate::contract::{
    BackendError, BackendResult, HostAction, ListFilter, OrchestrationClient, ResourceKind,
    ResourceRef,
};

const SEED_TENANTS: [(&str, &str); 2] = [("default", "local"), ("ovh-lab", "ovh")];
const SEED_IMAGES: [(&str, &str); 3] = [
    ("Ubuntu 18.04", "https://cloud-images.ubuntu.com/bionic/current/"),
    ("Ubuntu 20.04", "https://cloud-images.ubuntu.com/focal/current/"),
    ("CentOS 7", "https://cloud.centos.org/centos/7/images/"),
];
const DEFAULT_GROUP: &str = "default";

struct Entry {
    /// `None` for resources visible to every tenant.
    tenant: Option<String>,
    resource: Resource,
    /// Hosts bound to this entry (security groups only).
    hosts: BTreeSet<String>,
}

impl Entry {
    fn id(&self) -> &str {
        self.resource.str_field("id").unwrap_or_default()
    }

    fn name(&self) -> &str {
        self.resource.str_field("name").unwrap_or_default()
    }

    fn matches(&self, id_or_name: &str) -> bool {
        self.id() == id_or_name || self.name() == id_or_name
    }

    /// Owned by `tenant`, or shared.
    fn visible_to(&self, tenant: &str) -> bool {
        self.tenant.as_deref().map_or(true, |t| t == tenant)
    }

    fn to_ref(&self) -> ResourceRef {
        ResourceRef::new(self.id(), self.name())
    }
}

struct State {
    current_tenant: String,
    tenants: BTreeMap<String, String>,
    store: HashMap<ResourceKind, Vec<Entry>>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, kind: ResourceKind) -> String {
        self.next_id += 1;
        format!("{}-{:04}", kind.as_str(), self.next_id)
    }

    fn entries(&self, kind: ResourceKind) -> &[Entry] {
        self.store.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Lookups by id or name only see the current tenant's entries and shared ones.
    fn find(&self, kind: ResourceKind, id: &str) -> BackendResult<&Entry> {
        let tenant = self.current_tenant.as_str();
        self.entries(kind)
            .iter()
            .find(|e| e.visible_to(tenant) && e.matches(id))
            .ok_or_else(|| BackendError::not_found(kind, id))
    }

    fn find_mut(&mut self, kind: ResourceKind, id: &str) -> BackendResult<&mut Entry> {
        let tenant = self.current_tenant.as_str();
        self.store
            .get_mut(&kind)
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|e| e.visible_to(tenant) && e.matches(id))
            })
            .ok_or_else(|| BackendError::not_found(kind, id))
    }

    fn tenant_resource(&self, name: &str) -> BackendResult<Resource> {
        let provider = self
            .tenants
            .get(name)
            .ok_or_else(|| BackendError::not_found(ResourceKind::Tenant, name))?;
        Ok(Resource::new(ResourceKind::Tenant.schema())
            .with("name", name)
            .with("provider", provider.as_str())
            .with("current", name == self.current_tenant))
    }
}

pub struct InMemoryOrchestrator {
    registry: Arc<SchemaRegistry>,
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl InMemoryOrchestrator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        let mut state = State {
            current_tenant: SEED_TENANTS[0].0.to_string(),
            tenants: SEED_TENANTS
                .iter()
                .map(|(n, p)| (n.to_string(), p.to_string()))
                .collect(),
            store: HashMap::new(),
            next_id: 0,
        };

        for (name, url) in SEED_IMAGES {
            let id = state.next_id(ResourceKind::Image);
            let resource = Resource::new(ResourceKind::Image.schema())
                .with("id", id)
                .with("name", name)
                .with("url", url);
            state.store.entry(ResourceKind::Image).or_default().push(Entry {
                tenant: None,
                resource,
                hosts: BTreeSet::new(),
            });
        }

        for (tenant, _) in SEED_TENANTS {
            let id = state.next_id(ResourceKind::SecurityGroup);
            let resource = Resource::new(ResourceKind::SecurityGroup.schema())
                .with("id", id)
                .with("name", DEFAULT_GROUP)
                .with("description", "default security group")
                .with("rules", Vec::<Value>::new());
            state
                .store
                .entry(ResourceKind::SecurityGroup)
                .or_default()
                .push(Entry {
                    tenant: Some(tenant.to_string()),
                    resource,
                    hosts: BTreeSet::new(),
                });
        }

        Self {
            registry,
            state: Mutex::new(state),
            latency: None,
        }
    }

    /// Delay every call by `latency` before it touches any state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Response-shaped resource for a freshly created `kind`.
    fn materialize(&self, kind: ResourceKind, spec: &Resource, id: &str, seq: u64) -> BackendResult<Resource> {
        let schema = self
            .registry
            .resolve(kind.schema())
            .map_err(|e| BackendError::internal(e.to_string()))?;
        let mut resource = spec.project(schema).with("id", id);

        let mut default = |field: &str, value: Value| {
            if schema.by_internal(field).is_some() && !resource.is_set(field) {
                resource.set(field, value);
            }
        };
        match kind {
            ResourceKind::Host => {
                default("state", Value::enumeration("STARTED"));
                default("cores", Value::Integer(1));
                default("ram", Value::Number(2.0));
                default("disk", Value::Integer(16));
                default("private_ip", Value::from(format!("10.0.{}.{}", seq / 250, seq % 250 + 2)));
                default("public_ip", Value::Null);
            }
            ResourceKind::Volume => {
                default("speed", Value::enumeration("HDD"));
                default("host", Value::Null);
                default("mount_path", Value::Null);
                default("attachments", Value::Sequence(Vec::new()));
            }
            ResourceKind::Cluster => {
                default("complexity", Value::enumeration("SMALL"));
                default("state", Value::enumeration("NOMINAL"));
                default("masters", Value::Sequence(Vec::new()));
                default("nodes", Value::Sequence(Vec::new()));
            }
            ResourceKind::SecurityGroup => default("rules", Value::Sequence(Vec::new())),
            ResourceKind::Network => {
                default("gateway_id", Value::Null);
                default("subnets", Value::Sequence(Vec::new()));
            }
            ResourceKind::Subnet => {
                default("cidr", Value::from(format!("192.168.{}.0/24", seq % 256)));
                default("gateway_id", Value::Null);
            }
            ResourceKind::Bucket => {
                default("host", Value::Null);
                default("mount_path", Value::Null);
            }
            ResourceKind::Tenant | ResourceKind::Image => {}
        }
        Ok(resource)
    }
}

fn require_host(kind: ResourceKind) -> BackendResult<()> {
    if kind == ResourceKind::Host {
        Ok(())
    } else {
        Err(BackendError::invalid_request(format!(
            "power actions apply to hosts, not {kind}"
        )))
    }
}

#[async_trait]
impl OrchestrationClient for InMemoryOrchestrator {
    async fn create(&self, kind: ResourceKind, spec: Resource) -> BackendResult<String> {
        self.pause().await;
        let expected = kind
            .request_schema()
            .ok_or_else(|| BackendError::invalid_request(format!("{kind} cannot be created")))?;
        if spec.kind() != expected {
            return Err(BackendError::invalid_request(format!(
                "expected a {expected}, got a {}",
                spec.kind()
            )));
        }
        let name = spec
            .str_field("name")
            .ok_or_else(|| BackendError::invalid_request("name is required"))?
            .to_string();

        let mut state = self.state.lock();
        let tenant = state.current_tenant.clone();
        if state
            .entries(kind)
            .iter()
            .any(|e| e.name() == name && e.tenant.as_deref() == Some(tenant.as_str()))
        {
            return Err(BackendError::already_exists(kind, name));
        }
        let network = match kind {
            ResourceKind::Subnet => Some(
                spec.str_field("network")
                    .map(str::to_string)
                    .ok_or_else(|| BackendError::invalid_request("network is required"))?,
            ),
            _ => None,
        };
        if let Some(network) = &network {
            state.find(ResourceKind::Network, network)?;
        }

        let id = state.next_id(kind);
        let resource = self.materialize(kind, &spec, &id, state.next_id)?;

        if kind == ResourceKind::Host {
            if let Some(group) = state
                .store
                .get_mut(&ResourceKind::SecurityGroup)
                .and_then(|groups| {
                    groups.iter_mut().find(|g| {
                        g.name() == DEFAULT_GROUP && g.tenant.as_deref() == Some(tenant.as_str())
                    })
                })
            {
                group.hosts.insert(id.clone());
            }
        }
        if let Some(network) = &network {
            let entry = state.find_mut(ResourceKind::Network, network)?;
            let mut subnets = match entry.resource.get("subnets") {
                Some(Value::Sequence(items)) => items.clone(),
                _ => Vec::new(),
            };
            subnets.push(Value::from(name.clone()));
            entry.resource.set("subnets", subnets);
        }

        state.store.entry(kind).or_default().push(Entry {
            tenant: Some(tenant.clone()),
            resource,
            hosts: BTreeSet::new(),
        });
        tracing::debug!(%kind, %id, %name, %tenant, "created");
        Ok(id)
    }

    async fn list(&self, kind: ResourceKind, filter: &ListFilter) -> BackendResult<Vec<ResourceRef>> {
        self.pause().await;
        let state = self.state.lock();

        if kind == ResourceKind::Tenant {
            return Ok(state
                .tenants
                .keys()
                .map(|name| ResourceRef::new(name.as_str(), name.as_str()))
                .collect());
        }

        let bound_to = match &filter.host {
            Some(host) => Some(state.find(ResourceKind::Host, host)?.id().to_string()),
            None => None,
        };
        let tenant = filter
            .tenant_id
            .as_deref()
            .unwrap_or(state.current_tenant.as_str());

        Ok(state
            .entries(kind)
            .iter()
            .filter(|e| filter.all || e.visible_to(tenant))
            .filter(|e| bound_to.as_ref().map_or(true, |h| e.hosts.contains(h)))
            .map(Entry::to_ref)
            .collect())
    }

    async fn inspect(&self, kind: ResourceKind, id: &str) -> BackendResult<Resource> {
        self.pause().await;
        let state = self.state.lock();
        if kind == ResourceKind::Tenant {
            return state.tenant_resource(id);
        }
        Ok(state.find(kind, id)?.resource.clone())
    }

    async fn delete(&self, kind: ResourceKind, id: &str, tenant: Option<&str>) -> BackendResult<()> {
        self.pause().await;
        if !kind.is_deletable() {
            return Err(BackendError::invalid_request(format!("{kind} cannot be deleted")));
        }
        let mut state = self.state.lock();
        let tenant = tenant.map_or_else(|| state.current_tenant.clone(), str::to_string);
        let entries = state.store.entry(kind).or_default();
        let pos = entries
            .iter()
            .position(|e| e.matches(id) && e.tenant.as_deref() == Some(tenant.as_str()))
            .ok_or_else(|| BackendError::not_found(kind, id))?;
        let removed = entries.remove(pos);

        if kind == ResourceKind::Host {
            let host_id = removed.id().to_string();
            if let Some(groups) = state.store.get_mut(&ResourceKind::SecurityGroup) {
                for group in groups {
                    group.hosts.remove(&host_id);
                }
            }
        }
        if kind == ResourceKind::Subnet {
            if let Some(network) = removed.resource.str_field("network") {
                if let Ok(entry) = state.find_mut(ResourceKind::Network, network) {
                    let kept: Vec<Value> = match entry.resource.get("subnets") {
                        Some(Value::Sequence(items)) => items
                            .iter()
                            .filter(|v| v.as_str() != Some(removed.name()))
                            .cloned()
                            .collect(),
                        _ => Vec::new(),
                    };
                    entry.resource.set("subnets", kept);
                }
            }
        }
        tracing::debug!(%kind, id = removed.id(), %tenant, "deleted");
        Ok(())
    }

    async fn act(&self, kind: ResourceKind, id: &str, action: HostAction) -> BackendResult<Resource> {
        self.pause().await;
        require_host(kind)?;
        let mut state = self.state.lock();
        let entry = state.find_mut(kind, id)?;
        let next = match action {
            HostAction::Start | HostAction::Reboot => "STARTED",
            HostAction::Stop => "STOPPED",
        };
        entry.resource.set("state", Value::enumeration(next));
        tracing::debug!(id = entry.id(), %action, state = next, "host power action");
        Ok(entry.resource.clone())
    }

    async fn ssh_config(&self, host: &str) -> BackendResult<Resource> {
        self.pause().await;
        let state = self.state.lock();
        let entry = state.find(ResourceKind::Host, host)?;
        let ip = entry
            .resource
            .str_field("public_ip")
            .or_else(|| entry.resource.str_field("private_ip"))
            .unwrap_or("127.0.0.1");
        Ok(Resource::new("SshConfig")
            .with("hostname", entry.name())
            .with("ip", ip)
            .with("port", 22i64)
            .with("user", "safescale")
            .with("gateway", Value::Null))
    }

    async fn current_tenant(&self) -> BackendResult<Resource> {
        self.pause().await;
        let state = self.state.lock();
        state.tenant_resource(&state.current_tenant)
    }

    async fn set_current_tenant(&self, name: &str) -> BackendResult<Resource> {
        self.pause().await;
        let mut state = self.state.lock();
        if !state.tenants.contains_key(name) {
            return Err(BackendError::not_found(ResourceKind::Tenant, name));
        }
        state.current_tenant = name.to_string();
        tracing::info!(tenant = name, "current tenant changed");
        state.tenant_resource(name)
    }
}
