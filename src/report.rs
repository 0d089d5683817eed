//! Human and machine output for `sync` and `list`.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::reconcile::SyncSummary;
use crate::resource::{RemoteResource, ResourceKind};

#[derive(Debug, facet::Facet)]
pub struct SummaryJson {
    pub kind: String,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl From<&SyncSummary> for SummaryJson {
    fn from(summary: &SyncSummary) -> Self {
        Self {
            kind: summary.kind.tag().to_string(),
            written: summary.written,
            unchanged: summary.unchanged,
            failed: summary.failed,
        }
    }
}

#[derive(Debug, facet::Facet)]
pub struct ResourceJson {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub node: String,
}

impl From<&RemoteResource> for ResourceJson {
    fn from(resource: &RemoteResource) -> Self {
        Self {
            id: resource.id.clone(),
            kind: resource.kind.tag().to_string(),
            name: resource.display_name.clone(),
            node: resource.location_node.clone(),
        }
    }
}

/// `VMs: 2 written, 5 unchanged, 1 failed`
pub fn summary_line(summary: &SyncSummary) -> String {
    let mut line = format!(
        "{}: {} written, {} unchanged",
        summary.kind.folder(),
        summary.written,
        summary.unchanged
    );
    if summary.failed > 0 {
        line.push_str(&format!(", {} failed", summary.failed));
    }
    line
}

/// `VM 101  Web Server  (pve1)`
pub fn resource_line(resource: &RemoteResource) -> String {
    let name = if resource.display_name.is_empty() {
        "-"
    } else {
        resource.display_name.as_str()
    };
    format!(
        "{} {}  {}  ({})",
        resource.kind.label(),
        resource.id,
        name,
        resource.location_node
    )
}

/// Spinner on stderr while a kind syncs; `None` when stderr is not a TTY.
pub fn spinner(kind: ResourceKind) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let s = ProgressBar::new_spinner();
    s.set_message(format!("Syncing {}...", kind.folder()));
    s.enable_steady_tick(Duration::from_millis(80));
    Some(s)
}
