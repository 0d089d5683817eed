use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config to {path}")]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("cannot reach Proxmox API at {url}")]
    #[diagnostic(help("check `proxmox.base_url` and that the cluster is reachable"))]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Proxmox API rejected request to {url} with HTTP {status}: {body}")]
    #[diagnostic(help("check `proxmox.api_token` and the token's privileges"))]
    Auth {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response format from {url}: {message}")]
    Format { url: String, message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}
