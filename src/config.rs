use std::path::{Path, PathBuf};

use facet::Facet;

use crate::error::SyncError;
use crate::paths;
use crate::resource::ResourceKind;

#[derive(Debug, Clone, Facet)]
pub struct Config {
    #[facet(default)]
    pub proxmox: ProxmoxConfig,
    #[facet(default)]
    pub notes: NotesConfig,
    #[facet(default)]
    pub sync: SyncConfig,
    #[facet(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct ProxmoxConfig {
    #[facet(default)]
    pub base_url: String,
    /// `USER@REALM!TOKENID=VALUE`
    #[facet(default)]
    pub api_token: String,
    #[facet(default = true)]
    pub verify_tls: bool,
    #[facet(default = 30)]
    pub timeout_s: u64,
}

impl Default for ProxmoxConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            verify_tls: true,
            timeout_s: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct NotesConfig {
    /// Relative paths resolve against the config file's directory. Empty
    /// means that directory itself.
    #[facet(default)]
    pub directory: String,
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct SyncConfig {
    /// Kinds synced when `sync` gets no `--kind`. Empty means vm + container.
    #[facet(default)]
    pub kinds: Vec<String>,
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct LoggingConfig {
    /// Sync log location. Empty means `~/.local/share/pvenotes/sync.log`.
    #[facet(default)]
    pub file: String,
}

// ── SystemConfig ──────────────────────────────────────────

/// Resolved runtime config: the parsed TOML plus paths derived from where the
/// config file lives.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Canonicalized path to the config file.
    pub config_path: PathBuf,
    /// Directory the documents are written under.
    pub notes_dir: PathBuf,
    /// Parsed TOML config.
    pub config: Config,
}

impl SystemConfig {
    /// Base URL without trailing `/` or `/api2/json`, so endpoint paths can
    /// always be appended as `/api2/json/...`.
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.config.proxmox.base_url)
    }

    /// Kinds to sync when none are given on the command line.
    pub fn default_kinds(&self) -> Result<Vec<ResourceKind>, SyncError> {
        if self.config.sync.kinds.is_empty() {
            return Ok(vec![ResourceKind::Vm, ResourceKind::Container]);
        }
        parse_kinds(&self.config.sync.kinds)
    }

    pub fn log_file(&self) -> PathBuf {
        if self.config.logging.file.is_empty() {
            paths::log_file()
        } else {
            resolve_relative(&self.config_path, &self.config.logging.file)
        }
    }
}

fn parse_kinds(kinds: &[String]) -> Result<Vec<ResourceKind>, SyncError> {
    let mut resolved = Vec::new();
    for kind in kinds {
        let kind: ResourceKind = kind.parse()?;
        if !resolved.contains(&kind) {
            resolved.push(kind);
        }
    }
    Ok(resolved)
}

// ── validation ────────────────────────────────────────────

fn validate_config(config: &Config) -> Result<(), SyncError> {
    let base_url = config.proxmox.base_url.trim();
    if base_url.is_empty() {
        return Err(SyncError::Validation {
            message: "proxmox.base_url must be set".into(),
        });
    }
    if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
        return Err(SyncError::Validation {
            message: format!("proxmox.base_url must start with http:// or https:// (got '{base_url}')"),
        });
    }

    validate_token(&config.proxmox.api_token)?;

    if config.proxmox.timeout_s < 1 {
        return Err(SyncError::Validation {
            message: "proxmox.timeout_s must be at least 1".into(),
        });
    }

    parse_kinds(&config.sync.kinds)?;

    Ok(())
}

/// Token must look like `USER@REALM!TOKENID=VALUE`.
fn validate_token(token: &str) -> Result<(), SyncError> {
    let invalid = || SyncError::Validation {
        message: "proxmox.api_token must have the form USER@REALM!TOKENID=VALUE".into(),
    };

    let (user, rest) = token.split_once('!').ok_or_else(invalid)?;
    let (token_id, secret) = rest.split_once('=').ok_or_else(invalid)?;
    let Some((name, realm)) = user.split_once('@') else {
        return Err(invalid());
    };
    if name.is_empty() || realm.is_empty() || token_id.is_empty() || secret.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

// ── helpers ───────────────────────────────────────────────

/// `https://pve:8006/api2/json/` → `https://pve:8006`
pub(crate) fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix("/api2/json")
        .unwrap_or(url)
        .trim_end_matches('/')
        .to_string()
}

fn resolve_relative(config_path: &Path, value: &str) -> PathBuf {
    let p = Path::new(value);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    let parent = config_path.parent().unwrap_or(Path::new("."));
    parent.join(p)
}

// ── public API ────────────────────────────────────────────

pub fn load_config(path: &Path) -> Result<SystemConfig, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SyncError::ConfigLoad {
        path: path.display().to_string(),
        source,
    })?;

    let config: Config = facet_toml::from_str(&contents).map_err(|e| SyncError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    validate_config(&config)?;

    let canonical = path.canonicalize().map_err(|source| SyncError::ConfigLoad {
        path: path.display().to_string(),
        source,
    })?;

    let notes_dir = resolve_relative(&canonical, &config.notes.directory);

    Ok(SystemConfig {
        config_path: canonical,
        notes_dir,
        config,
    })
}
