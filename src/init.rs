use std::path::Path;

use crate::error::SyncError;

const DEFAULT_BASE_URL: &str = "https://your-proxmox-server:8006";

// ── public entry point ───────────────────────────────────

/// Write a starter config to `output_path`. Refuses to overwrite unless
/// `force` is set.
pub fn run(output_path: &Path, force: bool) -> Result<(), SyncError> {
    if output_path.exists() && !force {
        return Err(SyncError::Validation {
            message: format!(
                "{} already exists (use --force to overwrite)",
                output_path.display()
            ),
        });
    }

    let toml = generate_toml(DEFAULT_BASE_URL, "Proxmox");
    std::fs::write(output_path, &toml).map_err(|e| SyncError::ConfigWrite {
        path: output_path.display().to_string(),
        source: e,
    })?;

    println!("Created {}", output_path.display());
    println!("Set proxmox.api_token, then run `pvenotes sync`.");
    Ok(())
}

fn generate_toml(base_url: &str, notes_dir: &str) -> String {
    let mut out = String::new();

    // [proxmox]
    out.push_str("[proxmox]\n");
    out.push_str(&format!("base_url = \"{base_url}\"\n"));
    out.push_str("# USER@REALM!TOKENID=VALUE\n");
    out.push_str("api_token = \"\"\n");
    out.push_str("# verify_tls = false   # self-signed cluster certificate\n");
    out.push_str("# timeout_s = 30\n");
    out.push('\n');

    // [notes]
    out.push_str("[notes]\n");
    out.push_str("# relative to this file; empty = this directory\n");
    out.push_str(&format!("directory = \"{notes_dir}\"\n"));
    out.push('\n');

    // [sync]
    out.push_str("[sync]\n");
    out.push_str("kinds = [\"vm\", \"container\"]\n");
    out.push('\n');

    out.push_str("# [logging]\n");
    out.push_str("# file = \"pvenotes.log\"\n");

    out
}

// ── tests ────────────────────────────────────────────────
