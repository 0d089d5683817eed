//! Read-only access to the cluster inventory.
//!
//! `ResourceFetcher` is the seam the reconciler talks to; `ProxmoxClient`
//! implements it against the Proxmox VE HTTP API. Tests substitute an
//! in-memory fetcher.

use std::time::Duration;

use facet::Facet;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::config::SystemConfig;
use crate::error::SyncError;
use crate::resource::{RemoteResource, ResourceKind};

#[allow(async_fn_in_trait)] // trait is internal-only
pub trait ResourceFetcher {
    /// List inventory entries for `kind`. May return entries of other kinds
    /// that share the same listing; callers filter.
    ///
    /// An unreachable or rejecting cluster is an error, never an empty list.
    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<RemoteResource>, SyncError>;

    /// Free-text notes of one resource. A resource without notes yields `""`.
    async fn get_notes(&self, resource: &RemoteResource) -> Result<String, SyncError>;
}

// ── wire types ───────────────────────────────────────────

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ListEnvelope {
    #[facet(default)]
    data: Option<Vec<Option<ClusterEntry>>>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ClusterEntry {
    #[facet(default)]
    #[facet(rename = "type")]
    entry_type: String,
    #[facet(default)]
    vmid: Option<u64>,
    #[facet(default)]
    name: String,
    #[facet(default)]
    node: String,
    #[facet(default)]
    status: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ConfigEnvelope {
    #[facet(default)]
    data: Option<ResourceConfig>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ResourceConfig {
    #[facet(default)]
    description: Option<String>,
}

impl ClusterEntry {
    fn into_resource(self) -> Option<RemoteResource> {
        if self.status == "unknown" {
            return None;
        }
        let kind = ResourceKind::from_cluster_type(&self.entry_type)?;
        let (id, display_name) = match kind {
            ResourceKind::Host => (self.node.clone(), self.node.clone()),
            ResourceKind::Vm | ResourceKind::Container => (self.vmid?.to_string(), self.name),
        };
        if id.is_empty() {
            return None;
        }
        Some(RemoteResource {
            id,
            kind,
            display_name,
            location_node: self.node,
        })
    }
}

/// Parse a `/cluster/resources` response body.
fn parse_resource_list(body: &str) -> Result<Vec<RemoteResource>, String> {
    let envelope: ListEnvelope = facet_json::from_str(body).map_err(|e| e.to_string())?;
    let entries = envelope
        .data
        .ok_or_else(|| "data is not an array".to_string())?;
    Ok(entries
        .into_iter()
        .flatten()
        .filter_map(ClusterEntry::into_resource)
        .collect())
}

/// Parse a `.../config` response body into the description text.
fn parse_notes(body: &str) -> Result<String, String> {
    let envelope: ConfigEnvelope = facet_json::from_str(body).map_err(|e| e.to_string())?;
    Ok(envelope
        .data
        .and_then(|config| config.description)
        .unwrap_or_default())
}

/// Config endpoint carrying the resource's description.
fn notes_path(resource: &RemoteResource) -> String {
    let node = &resource.location_node;
    let id = &resource.id;
    match resource.kind {
        ResourceKind::Vm => format!("/api2/json/nodes/{node}/qemu/{id}/config"),
        ResourceKind::Container => format!("/api2/json/nodes/{node}/lxc/{id}/config"),
        ResourceKind::Host => format!("/api2/json/nodes/{node}/config"),
    }
}

// ── ProxmoxClient ────────────────────────────────────────

/// Proxmox VE API client authenticated with an API token.
pub struct ProxmoxClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ProxmoxClient {
    pub fn new(sys_config: &SystemConfig) -> Result<Self, SyncError> {
        let proxmox = &sys_config.config.proxmox;
        let base_url = sys_config.base_url();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(proxmox.timeout_s))
            .danger_accept_invalid_certs(!proxmox.verify_tls)
            .build()
            .map_err(|source| SyncError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            api_token: proxmox.api_token.clone(),
        })
    }

    /// GET `path` and return the body of a 2xx response.
    async fn get(&self, path: &str) -> Result<String, SyncError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("PVEAPIToken={}", self.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| SyncError::Transport {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(SyncError::Auth {
                url,
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

impl ResourceFetcher for ProxmoxClient {
    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<RemoteResource>, SyncError> {
        let path = format!("/api2/json/cluster/resources?type={}", kind.cluster_filter());
        let body = self.get(&path).await?;
        let resources = parse_resource_list(&body).map_err(|message| {
            tracing::error!(body = %body, "unexpected resource list response");
            SyncError::Format {
                url: format!("{}{path}", self.base_url),
                message,
            }
        })?;
        tracing::debug!(kind = %kind, count = resources.len(), "listed resources");
        Ok(resources)
    }

    async fn get_notes(&self, resource: &RemoteResource) -> Result<String, SyncError> {
        let path = notes_path(resource);
        let body = self.get(&path).await?;
        parse_notes(&body).map_err(|message| SyncError::Format {
            url: format!("{}{path}", self.base_url),
            message,
        })
    }
}
