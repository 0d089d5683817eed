//! Write-or-skip reconciliation of remote notes into local documents.
//!
//! For every resource the proposed document is built from the remote notes
//! and the existing document's metadata block, then compared against what is
//! on disk. Two independent predicates decide a write:
//!
//! - [`body_changed`]: the normalized bodies differ.
//! - [`metadata_malformed`]: the existing block lacks a correct, single
//!   `Resource ID` / `Resource Type` line.
//!
//! Resources are processed one at a time. A failure on one resource is
//! logged and counted; it never aborts the rest of the batch.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::fetcher::ResourceFetcher;
use crate::metadata::{self, MetadataBlock, RESOURCE_ID, RESOURCE_TYPE};
use crate::paths;
use crate::resource::{RemoteResource, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReason {
    /// No document existed at the canonical path.
    Created,
    /// Remote notes differ from the stored body.
    BodyChanged,
    /// Body matched but the system-owned metadata was missing or wrong.
    MetadataRepaired,
}

impl fmt::Display for WriteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteReason::Created => "created",
            WriteReason::BodyChanged => "body changed",
            WriteReason::MetadataRepaired => "metadata repaired",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Write(WriteReason),
    Skip,
}

/// Proposed document content and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub content: String,
    pub decision: Decision,
}

/// Outcome of one reconciliation pass over a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub kind: ResourceKind,
    /// Documents actually written this pass.
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            written: 0,
            unchanged: 0,
            failed: 0,
        }
    }

    fn record(&mut self, outcome: &Result<Decision, SyncError>) {
        match outcome {
            Ok(Decision::Write(_)) => self.written += 1,
            Ok(Decision::Skip) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
    }
}

// ── planning (pure) ──────────────────────────────────────

/// Build the proposed document for `id`/`kind`.
///
/// The block starts with the existing document's lines (minus owned keys),
/// then remote block fields the existing block does not have, then
/// `Resource ID` and `Resource Type`. The body is the remote notes with any
/// leading block removed.
pub fn propose(existing: Option<&str>, remote_notes: &str, id: &str, kind: ResourceKind) -> String {
    let (remote_block, body) = metadata::split(remote_notes).into_parts();

    let mut block = existing
        .and_then(|content| metadata::split(content).into_parts().0)
        .map(|existing_block| existing_block.without_owned_keys())
        .unwrap_or_default();

    if let Some(remote_block) = remote_block {
        block.merge_missing(&remote_block.without_owned_keys());
    }

    block.push_field(RESOURCE_ID, id);
    block.push_field(RESOURCE_TYPE, kind.tag());

    metadata::compose(&block, body)
}

/// True when the bodies of the two documents differ after normalization.
pub fn body_changed(existing: &str, proposed: &str) -> bool {
    let existing_body = metadata::split(existing).body();
    let proposed_body = metadata::split(proposed).body();
    metadata::normalize_body(existing_body) != metadata::normalize_body(proposed_body)
}

/// True when the existing document has no block, or its block does not hold
/// exactly one `Resource ID` and one `Resource Type` line with the expected
/// values.
pub fn metadata_malformed(existing: &str, id: &str, kind: ResourceKind) -> bool {
    let split = metadata::split(existing);
    let Some(block) = split.block() else {
        return true;
    };
    !owned_field_ok(block, RESOURCE_ID, id) || !owned_field_ok(block, RESOURCE_TYPE, kind.tag())
}

fn owned_field_ok(block: &MetadataBlock, key: &str, expected: &str) -> bool {
    block.count_field(key) == 1 && block.field(key) == Some(expected)
}

/// Build the proposed document and decide whether it must be written.
pub fn plan(existing: Option<&str>, remote_notes: &str, id: &str, kind: ResourceKind) -> Plan {
    let content = propose(existing, remote_notes, id, kind);
    let decision = match existing {
        None => Decision::Write(WriteReason::Created),
        Some(existing) if body_changed(existing, &content) => {
            Decision::Write(WriteReason::BodyChanged)
        }
        Some(existing) if metadata_malformed(existing, id, kind) => {
            Decision::Write(WriteReason::MetadataRepaired)
        }
        Some(_) => Decision::Skip,
    };
    Plan { content, decision }
}

/// Combine the notes of all hosts into the text of the aggregate hosts
/// document: one `## <host>` section per host, remote block fields merged
/// first-wins.
pub fn aggregate_host_notes(hosts: &[&RemoteResource], notes: &[String]) -> String {
    let mut block = MetadataBlock::new();
    let mut sections = Vec::with_capacity(hosts.len());

    for (host, text) in hosts.iter().zip(notes) {
        let (host_block, body) = metadata::split(text).into_parts();
        if let Some(host_block) = host_block {
            block.merge_missing(&host_block.without_owned_keys());
        }

        let title = host_title(host);
        let body = body.trim();
        if body.is_empty() {
            sections.push(format!("## {title}"));
        } else {
            sections.push(format!("## {title}\n\n{body}"));
        }
    }

    let body = sections.join("\n\n");
    if block.is_empty() {
        body
    } else {
        metadata::compose(&block, &body)
    }
}

fn host_title(host: &RemoteResource) -> &str {
    if host.display_name.is_empty() {
        &host.id
    } else {
        &host.display_name
    }
}

/// Body of the `## <title>` section of an aggregate hosts document. The
/// section runs until the heading of any host in `titles`.
pub fn previous_host_section(existing: &str, title: &str, titles: &[&str]) -> Option<String> {
    let mut lines = metadata::split(existing).body().lines();
    lines.by_ref().find(|line| is_host_heading(line, title))?;
    let section: Vec<&str> = lines
        .take_while(|line| !titles.iter().any(|t| is_host_heading(line, t)))
        .collect();
    Some(section.join("\n").trim().to_string())
}

fn is_host_heading(line: &str, title: &str) -> bool {
    line.trim_end().strip_prefix("## ") == Some(title)
}

// ── Reconciler ───────────────────────────────────────────

/// Mirrors one kind of inventory at a time into `notes_dir`.
///
/// At most one pass may run per directory at a time; callers serialize.
pub struct Reconciler<F> {
    fetcher: F,
    notes_dir: PathBuf,
}

impl<F: ResourceFetcher> Reconciler<F> {
    pub fn new(fetcher: F, notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            notes_dir: notes_dir.into(),
        }
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// List `kind` through the fetcher and reconcile it. Listing failures
    /// abort the pass for this kind.
    pub async fn sync_kind(&self, kind: ResourceKind) -> Result<SyncSummary, SyncError> {
        let resources = self.fetcher.list_resources(kind).await?;
        Ok(self.reconcile(kind, &resources).await)
    }

    /// Reconcile every resource of `kind` in `resources`; other kinds are
    /// ignored. `SyncSummary::written` is the number of documents written.
    pub async fn reconcile(&self, kind: ResourceKind, resources: &[RemoteResource]) -> SyncSummary {
        if kind == ResourceKind::Host {
            return self.reconcile_hosts(resources).await;
        }

        let mut summary = SyncSummary::new(kind);
        for resource in resources.iter().filter(|r| r.kind == kind) {
            let outcome = self.reconcile_one(resource).await;
            log_outcome(kind, &resource.id, &outcome);
            summary.record(&outcome);
        }

        tracing::info!(
            kind = %kind,
            written = summary.written,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "reconciliation pass finished"
        );
        summary
    }

    async fn reconcile_one(&self, resource: &RemoteResource) -> Result<Decision, SyncError> {
        let notes = self.fetcher.get_notes(resource).await?;
        let path = paths::document_path(&self.notes_dir, resource);
        apply(&path, &notes, &resource.id, resource.kind).await
    }

    async fn reconcile_hosts(&self, resources: &[RemoteResource]) -> SyncSummary {
        let mut summary = SyncSummary::new(ResourceKind::Host);

        let mut hosts: Vec<&RemoteResource> = resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Host)
            .collect();
        if hosts.is_empty() {
            return summary;
        }
        hosts.sort_by(|a, b| a.id.cmp(&b.id));

        let ids = hosts.iter().map(|h| h.id.as_str()).collect::<Vec<_>>().join(", ");
        let path = paths::hosts_document_path(&self.notes_dir);

        let existing = match read_existing(&path).await {
            Ok(existing) => existing,
            Err(e) => {
                let outcome = Err(e);
                log_outcome(ResourceKind::Host, &ids, &outcome);
                summary.record(&outcome);
                return summary;
            }
        };

        let Some((included, notes)) = self
            .fetch_host_notes(&hosts, existing.as_deref(), &mut summary)
            .await
        else {
            tracing::warn!(ids = %ids, "no host notes fetched, aggregate left untouched");
            return summary;
        };

        let aggregated = aggregate_host_notes(&included, &notes);
        let outcome =
            apply_plan(&path, existing.as_deref(), &aggregated, &ids, ResourceKind::Host).await;
        log_outcome(ResourceKind::Host, &ids, &outcome);
        summary.record(&outcome);
        summary
    }

    /// Notes of every host that has them. A host whose notes fail counts as
    /// failed and keeps its section from `existing`, if it had one. `None`
    /// when no host could be fetched at all.
    async fn fetch_host_notes<'a>(
        &self,
        hosts: &[&'a RemoteResource],
        existing: Option<&str>,
        summary: &mut SyncSummary,
    ) -> Option<(Vec<&'a RemoteResource>, Vec<String>)> {
        let titles: Vec<&str> = hosts.iter().map(|h| host_title(h)).collect();
        let mut included = Vec::with_capacity(hosts.len());
        let mut notes = Vec::with_capacity(hosts.len());
        let mut fetched = 0;

        for &host in hosts {
            match self.fetcher.get_notes(host).await {
                Ok(text) => {
                    included.push(host);
                    notes.push(text);
                    fetched += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %host.id, error = %e, "host notes unavailable, keeping previous section");
                    summary.failed += 1;
                    if let Some(section) = existing
                        .and_then(|content| previous_host_section(content, host_title(host), &titles))
                    {
                        included.push(host);
                        notes.push(section);
                    }
                }
            }
        }

        (fetched > 0).then_some((included, notes))
    }
}

fn log_outcome(kind: ResourceKind, id: &str, outcome: &Result<Decision, SyncError>) {
    match outcome {
        Ok(Decision::Write(reason)) => {
            tracing::info!(kind = %kind, id = %id, reason = %reason, "document written");
        }
        Ok(Decision::Skip) => {
            tracing::debug!(kind = %kind, id = %id, "document unchanged");
        }
        Err(e) => {
            tracing::warn!(kind = %kind, id = %id, error = %e, "skipping resource");
        }
    }
}

// ── document I/O ─────────────────────────────────────────

/// Plan against the document at `path` and write it when the plan says so.
async fn apply(
    path: &Path,
    remote_notes: &str,
    id: &str,
    kind: ResourceKind,
) -> Result<Decision, SyncError> {
    let existing = read_existing(path).await?;
    apply_plan(path, existing.as_deref(), remote_notes, id, kind).await
}

async fn apply_plan(
    path: &Path,
    existing: Option<&str>,
    remote_notes: &str,
    id: &str,
    kind: ResourceKind,
) -> Result<Decision, SyncError> {
    let plan = plan(existing, remote_notes, id, kind);
    if let Decision::Write(_) = plan.decision {
        write_document(path, &plan.content).await?;
    }
    Ok(plan.decision)
}

/// Read a document, returning `None` if it does not exist yet. Unreadable
/// files (including non-UTF-8 content) are errors so they are never
/// overwritten blindly.
async fn read_existing(path: &Path) -> Result<Option<String>, SyncError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SyncError::Io {
            context: format!("reading {}", path.display()),
            source,
        }),
    }
}

async fn write_document(path: &Path, content: &str) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SyncError::Io {
                context: format!("creating {}", parent.display()),
                source,
            })?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|source| SyncError::Io {
            context: format!("writing {}", path.display()),
            source,
        })
}
