//! Agent backends.
//!
//! The agent engine is external. An [`AgentRunner`] starts a run and hands
//! back its events as a stream that ends at `done` or `error`.

mod remote;
mod replay;

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use agent_protocol::{AgentEvent, Message, Part, Role};
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use super::error::{Error, Result};
use super::sandbox::{Sandbox, SandboxKind};
use super::session::RunState;
use crate::config::{AgentConfig, ResolvedSettings};

pub use remote::RemoteAgent;
pub use replay::ReplayAgent;

/// Conversation history entry sent with a run.
///
/// `content` is the concatenated text; `parts` keeps tool and activity
/// parts for agents that replay them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub parts: Vec<Part>,
}

impl From<Message> for ChatMessage {
    fn from(message: Message) -> Self {
        Self {
            content: message.text(),
            id: message.id,
            role: message.role,
            parts: message.parts,
        }
    }
}

/// Where the agent's tools execute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxTarget {
    #[serde(rename = "type")]
    pub kind: SandboxKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

impl From<&Sandbox> for SandboxTarget {
    fn from(sandbox: &Sandbox) -> Self {
        match sandbox {
            Sandbox::Local(local) => Self {
                kind: SandboxKind::Local,
                root: Some(local.root().to_path_buf()),
                remote_id: None,
            },
            Sandbox::Cloud(cloud) => Self {
                kind: SandboxKind::Cloud,
                root: None,
                remote_id: cloud.remote_id.clone(),
            },
        }
    }
}

/// Everything an agent needs to start a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub messages: Vec<ChatMessage>,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    pub settings: ResolvedSettings,
    pub sandbox: SandboxTarget,
}

/// Events of one run.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// A source of agent runs.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Start a run.
    ///
    /// Errors here mean the run never started; failures after that arrive
    /// as stream items.
    async fn stream(&self, request: RunRequest) -> Result<AgentEventStream>;
}

/// Build the backend `[agent]` points at, if any.
pub fn from_config(config: &AgentConfig) -> Result<Option<Arc<dyn AgentRunner>>> {
    let runner: Arc<dyn AgentRunner> = match (&config.upstream, &config.replay) {
        (Some(_), Some(_)) => {
            return Err(Error::Config(
                "agent.upstream and agent.replay are mutually exclusive".to_string(),
            ));
        }
        (Some(url), None) => Arc::new(RemoteAgent::new(url.clone())?),
        (None, Some(path)) => Arc::new(ReplayAgent::new(path)),
        (None, None) => return Ok(None),
    };

    Ok(Some(runner))
}
