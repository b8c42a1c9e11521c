//! Events produced by an agent run.
//!
//! The agent engine itself is external; this is the vocabulary it speaks.
//! Payload structs are shared with [`crate::wire::DataEvent`] so that the
//! data envelope carries them verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of an agent run's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    /// A model step began.
    StepStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_number: Option<u32>,
    },
    /// A model step finished.
    StepFinish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_number: Option<u32>,
    },
    /// A chunk of assistant text.
    Text { text: String },
    /// The model invoked a tool.
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    /// A tool invocation finished.
    ToolResult {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        is_error: bool,
    },
    TodosChanged(TodosChanged),
    FileWriteStart(FileContent),
    FileWritten(FileContent),
    FileEdited(FileEdited),
    FileRead(FileRead),
    Ls(ListDir),
    Glob(PatternMatch),
    Grep(PatternMatch),
    ExecuteStart(ExecuteStart),
    ExecuteFinish(ExecuteFinish),
    WebSearchStart(WebSearchStart),
    WebSearchFinish(WebSearchFinish),
    HttpRequestStart(HttpRequestStart),
    HttpRequestFinish(HttpRequestFinish),
    FetchUrlStart(FetchUrlStart),
    FetchUrlFinish(FetchUrlFinish),
    SubagentStart(SubagentStart),
    SubagentStep(SubagentStep),
    SubagentFinish(SubagentFinish),
    /// The run failed.
    Error { error: ErrorDetail },
    /// The run completed.
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl AgentEvent {
    /// The event kind as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StepStart { .. } => "step-start",
            Self::StepFinish { .. } => "step-finish",
            Self::Text { .. } => "text",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
            Self::TodosChanged(_) => "todos-changed",
            Self::FileWriteStart(_) => "file-write-start",
            Self::FileWritten(_) => "file-written",
            Self::FileEdited(_) => "file-edited",
            Self::FileRead(_) => "file-read",
            Self::Ls(_) => "ls",
            Self::Glob(_) => "glob",
            Self::Grep(_) => "grep",
            Self::ExecuteStart(_) => "execute-start",
            Self::ExecuteFinish(_) => "execute-finish",
            Self::WebSearchStart(_) => "web-search-start",
            Self::WebSearchFinish(_) => "web-search-finish",
            Self::HttpRequestStart(_) => "http-request-start",
            Self::HttpRequestFinish(_) => "http-request-finish",
            Self::FetchUrlStart(_) => "fetch-url-start",
            Self::FetchUrlFinish(_) => "fetch-url-finish",
            Self::SubagentStart(_) => "subagent-start",
            Self::SubagentStep(_) => "subagent-step",
            Self::SubagentFinish(_) => "subagent-finish",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    /// Whether this event ends the run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done { .. })
    }
}

/// Failure reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// Planning item as tracked by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
}

/// Agent-side todo status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodosChanged {
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

/// A file being written, or just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdited {
    pub path: String,
    #[serde(default)]
    pub occurrences: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRead {
    pub path: String,
    #[serde(default)]
    pub lines: u32,
}

/// Directory listing (`ls`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDir {
    pub path: String,
    #[serde(default)]
    pub count: u32,
}

/// Pattern search (`glob`, `grep`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStart {
    pub command: String,
    #[serde(default)]
    pub sandbox_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteFinish {
    pub command: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub sandbox_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchStart {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchFinish {
    pub query: String,
    #[serde(default)]
    pub result_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestStart {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestFinish {
    pub url: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchUrlStart {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchUrlFinish {
    pub url: String,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentStart {
    pub name: String,
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentStep {
    pub step_index: u32,
    #[serde(default)]
    pub tool_calls: Vec<SubagentToolCall>,
}

/// Tool call made inside a subagent step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentFinish {
    pub name: String,
    #[serde(default)]
    pub result: String,
}
