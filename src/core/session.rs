//! Session registry.
//!
//! A session is the unit of tenancy: it owns one sandbox and the run state
//! carried between turns. Sessions are created on first use and live for
//! the lifetime of the server.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use agent_protocol::{AgentEvent, TodoItem};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::core::sandbox::{CloudSandbox, LocalSandbox, Sandbox};

const MAX_ID_LEN: usize = 64;

/// Validated session identifier: `[A-Za-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id '{0}': expected 1-64 characters of [A-Za-z0-9_-]")]
pub struct InvalidSessionId(String);

impl SessionId {
    pub const DEFAULT: &'static str = "default";

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ID_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidSessionId(s.to_string()))
        }
    }
}

impl TryFrom<String> for SessionId {
    type Error = InvalidSessionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State handed to the agent at the start of each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub todos: Vec<TodoItem>,
    #[serde(default)]
    pub files: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub sandbox: Sandbox,
    pub state: RunState,
}

impl Session {
    /// Update session state from an event the agent emitted.
    pub fn observe(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::TodosChanged(change) => {
                self.state.todos.clone_from(&change.todos);
            }
            AgentEvent::ExecuteStart(exec) if !exec.sandbox_id.is_empty() => {
                self.sandbox.set_remote_id(&exec.sandbox_id);
            }
            AgentEvent::ExecuteFinish(exec) if !exec.sandbox_id.is_empty() => {
                self.sandbox.set_remote_id(&exec.sandbox_id);
            }
            _ => {}
        }
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// All live sessions, keyed by id.
#[derive(Debug)]
pub struct SessionRegistry {
    workspace: PathBuf,
    cloud: bool,
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    /// Local sessions get `workspace/<id>` as their sandbox root; cloud
    /// sessions start detached and learn their remote id from the agent.
    pub fn new(workspace: impl Into<PathBuf>, cloud: bool) -> Self {
        Self {
            workspace: workspace.into(),
            cloud,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn is_cloud(&self) -> bool {
        self.cloud
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Fetch a session, creating it (and its workspace) on first use.
    pub fn get_or_create(&self, id: &SessionId) -> SharedSession {
        if let Some(session) = self.get(id) {
            return session;
        }

        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(id.clone()).or_insert_with(|| {
            tracing::info!(session = %id, cloud = self.cloud, "creating session");
            Arc::new(Mutex::new(self.create(id)))
        }))
    }

    fn create(&self, id: &SessionId) -> Session {
        let sandbox = if self.cloud {
            Sandbox::Cloud(CloudSandbox::default())
        } else {
            let local = LocalSandbox::new(self.workspace.join(id.as_str()));
            if let Err(e) = local.ensure() {
                tracing::warn!(session = %id, error = %e, "failed to create sandbox workspace");
            }
            Sandbox::Local(local)
        };

        Session {
            id: id.clone(),
            sandbox,
            state: RunState::default(),
        }
    }

    /// Forget a session. Local files stay on disk and are picked up again
    /// if the id is reused.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session removed");
        }
        removed
    }

    /// Forget every session, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut sessions = self.sessions.write();
            let count = sessions.len();
            sessions.clear();
            count
        };
        tracing::info!(sessions = dropped, "sessions cleared");
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
