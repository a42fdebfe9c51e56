use std::fmt;

/// Kinds of resources the orchestration engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Tenant,
    Host,
    Volume,
    Cluster,
    SecurityGroup,
    Network,
    Subnet,
    Bucket,
    Image,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Tenant,
        ResourceKind::Host,
        ResourceKind::Volume,
        ResourceKind::Cluster,
        ResourceKind::SecurityGroup,
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::Bucket,
        ResourceKind::Image,
    ];

    /// Singular path segment, also used as the backend collection name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "tenant",
            ResourceKind::Host => "host",
            ResourceKind::Volume => "volume",
            ResourceKind::Cluster => "cluster",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Image => "image",
        }
    }

    pub const fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "tenants",
            ResourceKind::Host => "hosts",
            ResourceKind::Volume => "volumes",
            ResourceKind::Cluster => "clusters",
            ResourceKind::SecurityGroup => "security_groups",
            ResourceKind::Network => "networks",
            ResourceKind::Subnet => "subnets",
            ResourceKind::Bucket => "buckets",
            ResourceKind::Image => "images",
        }
    }

    /// Schema of a single resource as returned by inspect.
    pub const fn schema(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "Tenant",
            ResourceKind::Host => "Host",
            ResourceKind::Volume => "VolumeInspect",
            ResourceKind::Cluster => "Cluster",
            ResourceKind::SecurityGroup => "SecurityGroup",
            ResourceKind::Network => "Network",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::Bucket => "Bucket",
            ResourceKind::Image => "Image",
        }
    }

    /// Request body schema for create; `None` when the kind cannot be created
    /// through the gateway.
    pub const fn request_schema(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Host => Some("HostRequest"),
            ResourceKind::Volume => Some("VolumeRequest"),
            ResourceKind::Cluster => Some("ClusterRequest"),
            ResourceKind::SecurityGroup => Some("SecurityGroupRequest"),
            ResourceKind::Network => Some("NetworkRequest"),
            ResourceKind::Subnet => Some("SubnetRequest"),
            ResourceKind::Bucket => Some("BucketRequest"),
            ResourceKind::Tenant | ResourceKind::Image => None,
        }
    }

    pub const fn list_schema(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "TenantList",
            ResourceKind::Host => "HostList",
            ResourceKind::Volume => "VolumeList",
            ResourceKind::Cluster => "ClusterList",
            ResourceKind::SecurityGroup => "SecurityGroupList",
            ResourceKind::Network => "NetworkList",
            ResourceKind::Subnet => "SubnetList",
            ResourceKind::Bucket => "BucketList",
            ResourceKind::Image => "ImageList",
        }
    }

    /// Whether the kind supports delete.
    pub const fn is_deletable(&self) -> bool {
        self.request_schema().is_some()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power actions on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Start,
    Stop,
    Reboot,
}

impl HostAction {
    pub const ALL: [HostAction; 3] = [HostAction::Start, HostAction::Stop, HostAction::Reboot];

    pub const fn as_str(&self) -> &'static str {
        match self {
            HostAction::Start => "start",
            HostAction::Stop => "stop",
            HostAction::Reboot => "reboot",
        }
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a listed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Include resources the gateway did not create (or other tenants' resources).
    pub all: bool,
    pub tenant_id: Option<String>,
    /// Restrict to resources bound to this host.
    pub host: Option<String>,
}
