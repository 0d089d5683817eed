use std::path::{Path, PathBuf};

use crate::resource::{RemoteResource, ResourceKind};

/// File name of the single document all hosts reconcile into.
pub const HOSTS_DOCUMENT: &str = "Cluster Hosts.md";

/// Per-kind folder: `<notes_dir>/VMs`, `<notes_dir>/CTs`, `<notes_dir>/Hosts`.
pub fn kind_dir(notes_dir: &Path, kind: ResourceKind) -> PathBuf {
    notes_dir.join(kind.folder())
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`, one per UTF-16
/// code unit, so names outside the Basic Multilingual Plane get two.
/// `"Web Server!"` → `"Web_Server_"`
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.extend(std::iter::repeat_n('_', c.len_utf16()));
        }
    }
    out
}

/// `VM 101 -- Web_Server_.md`
pub fn document_file_name(resource: &RemoteResource) -> String {
    format!(
        "{} {} -- {}.md",
        resource.kind.label(),
        resource.id,
        sanitize_name(&resource.display_name)
    )
}

/// Canonical document path for a VM or container. The same
/// `(kind, id, display_name)` always yields the same path.
pub fn document_path(notes_dir: &Path, resource: &RemoteResource) -> PathBuf {
    kind_dir(notes_dir, resource.kind).join(document_file_name(resource))
}

/// Path of the aggregate hosts document: `<notes_dir>/Hosts/Cluster Hosts.md`
pub fn hosts_document_path(notes_dir: &Path) -> PathBuf {
    kind_dir(notes_dir, ResourceKind::Host).join(HOSTS_DOCUMENT)
}

/// Default sync log: `~/.local/share/pvenotes/sync.log`
pub fn log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pvenotes")
        .join("sync.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize_name("Web Server!"), "Web_Server_");
        assert_eq!(sanitize_name("db-01_primary"), "db-01_primary");
        assert_eq!(sanitize_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn sanitize_counts_utf16_code_units() {
        assert_eq!(sanitize_name("café"), "caf_");
        assert_eq!(sanitize_name("日本"), "__");
        assert_eq!(sanitize_name("db🚀"), "db__");
        assert_eq!(sanitize_name("𝔘x"), "__x");
    }

    #[test]
    fn document_path_layout() {
        let vm = RemoteResource::new("101", ResourceKind::Vm, "Web Server!", "pve1");
        assert_eq!(
            document_path(Path::new("/notes"), &vm),
            PathBuf::from("/notes/VMs/VM 101 -- Web_Server_.md")
        );

        let ct = RemoteResource::new("200", ResourceKind::Container, "", "pve2");
        assert_eq!(
            document_path(Path::new("/notes"), &ct),
            PathBuf::from("/notes/CTs/LXC 200 -- .md")
        );
    }

    #[test]
    fn document_path_is_stable() {
        let a = RemoteResource::new("7", ResourceKind::Vm, "x y", "pve1");
        let b = RemoteResource::new("7", ResourceKind::Vm, "x y", "pve2");
        assert_eq!(document_path(Path::new("n"), &a), document_path(Path::new("n"), &b));
    }

    #[test]
    fn hosts_share_one_document() {
        assert_eq!(
            hosts_document_path(Path::new("/notes")),
            PathBuf::from("/notes/Hosts/Cluster Hosts.md")
        );
    }
}
