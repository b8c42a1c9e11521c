//! Execution backends a session's agent runs against.
//!
//! The server only needs the file surface: listing, reading and writing.
//! Command execution happens inside the agent backend and is reported back
//! through `execute-*` events.

mod local;

pub use local::LocalSandbox;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("access denied: path outside workspace: {0}")]
    OutsideWorkspace(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file access is not supported for cloud sandboxes")]
    Unsupported,

    #[error("sandbox io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which backend a sandbox uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    Local,
    Cloud,
}

/// A cloud VM reached through the agent backend.
#[derive(Debug, Clone, Default)]
pub struct CloudSandbox {
    /// Remote id, known once the agent reported one.
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Sandbox {
    Local(LocalSandbox),
    Cloud(CloudSandbox),
}

impl Sandbox {
    #[must_use]
    pub const fn kind(&self) -> SandboxKind {
        match self {
            Self::Local(_) => SandboxKind::Local,
            Self::Cloud(_) => SandboxKind::Cloud,
        }
    }

    #[must_use]
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Cloud(cloud) => cloud.remote_id.as_deref(),
        }
    }

    /// Record the remote id reported by the agent. Local sandboxes ignore it.
    pub fn set_remote_id(&mut self, id: &str) {
        if let Self::Cloud(cloud) = self {
            if cloud.remote_id.as_deref() != Some(id) {
                tracing::info!(remote_id = id, "cloud sandbox attached");
                cloud.remote_id = Some(id.to_string());
            }
        }
    }

    pub fn list_files(&self) -> Result<Vec<String>, SandboxError> {
        match self {
            Self::Local(local) => local.list_files(),
            Self::Cloud(_) => Err(SandboxError::Unsupported),
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        match self {
            Self::Local(local) => local.read_file(path).await,
            Self::Cloud(_) => Err(SandboxError::Unsupported),
        }
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        match self {
            Self::Local(local) => local.write_file(path, content).await,
            Self::Cloud(_) => Err(SandboxError::Unsupported),
        }
    }
}
