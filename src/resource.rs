use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Inventory kinds mirrored into documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Host,
    Vm,
    Container,
}

impl ResourceKind {
    /// Value written to the `Resource Type` metadata field.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Host => "host",
            ResourceKind::Vm => "vm",
            ResourceKind::Container => "container",
        }
    }

    /// Folder under the notes directory holding this kind's documents.
    pub fn folder(self) -> &'static str {
        match self {
            ResourceKind::Host => "Hosts",
            ResourceKind::Vm => "VMs",
            ResourceKind::Container => "CTs",
        }
    }

    /// File name prefix, e.g. `VM 101 -- web.md`.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Host => "Host",
            ResourceKind::Vm => "VM",
            ResourceKind::Container => "LXC",
        }
    }

    /// Map a `type` from `/cluster/resources` to a kind. Storage, pools and
    /// SDN entries are not resources.
    pub fn from_cluster_type(ty: &str) -> Option<Self> {
        match ty {
            "node" => Some(ResourceKind::Host),
            "qemu" => Some(ResourceKind::Vm),
            "lxc" => Some(ResourceKind::Container),
            _ => None,
        }
    }

    /// The `type` filter accepted by `/cluster/resources`. VMs and containers
    /// share one listing.
    pub fn cluster_filter(self) -> &'static str {
        match self {
            ResourceKind::Host => "node",
            ResourceKind::Vm | ResourceKind::Container => "vm",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ResourceKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" | "node" => Ok(ResourceKind::Host),
            "vm" | "qemu" => Ok(ResourceKind::Vm),
            "container" | "ct" | "lxc" => Ok(ResourceKind::Container),
            other => Err(SyncError::Validation {
                message: format!("unknown resource kind '{other}' (use host, vm or container)"),
            }),
        }
    }
}

/// One inventory item as reported by the cluster. Built fresh on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    pub id: String,
    pub kind: ResourceKind,
    pub display_name: String,
    /// Cluster node hosting the resource; addresses the notes endpoint.
    pub location_node: String,
}

impl RemoteResource {
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        display_name: impl Into<String>,
        location_node: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: display_name.into(),
            location_node: location_node.into(),
        }
    }
}
