//! Events carried over the SSE transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{
    ExecuteFinish, ExecuteStart, FetchUrlFinish, FetchUrlStart, FileContent, FileEdited, FileRead,
    HttpRequestFinish, HttpRequestStart, ListDir, PatternMatch, SubagentFinish, SubagentStart,
    SubagentStep, TodosChanged, WebSearchFinish, WebSearchStart,
};

/// SSE payload sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WireEvent {
    StartStep,
    FinishStep,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    /// Raw text chunk, as forwarded by passthrough servers.
    Text {
        text: String,
    },
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        input: Value,
    },
    ToolOutputAvailable {
        tool_call_id: String,
        #[serde(default)]
        output: Value,
    },
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },
    /// Envelope for every non-standard event kind.
    Data(DataEvent),
    Error {
        error_text: String,
    },
    Finish {
        finish_reason: FinishReason,
    },
}

impl WireEvent {
    /// The event type as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StartStep => "start-step",
            Self::FinishStep => "finish-step",
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::Text { .. } => "text",
            Self::ToolInputAvailable { .. } => "tool-input-available",
            Self::ToolOutputAvailable { .. } => "tool-output-available",
            Self::ToolOutputError { .. } => "tool-output-error",
            Self::Data(_) => "data",
            Self::Error { .. } => "error",
            Self::Finish { .. } => "finish",
        }
    }
}

/// Why a run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    #[serde(other)]
    Other,
}

/// Custom event carried in a `data` envelope as `{name, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum DataEvent {
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
}

/// Handler family a data event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    Todos,
    File,
    Command,
    Web,
    Subagent,
}

impl DataEvent {
    /// The envelope `name`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
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
        }
    }

    #[must_use]
    pub const fn category(&self) -> DataCategory {
        match self {
            Self::TodosChanged(_) => DataCategory::Todos,
            Self::FileWriteStart(_)
            | Self::FileWritten(_)
            | Self::FileEdited(_)
            | Self::FileRead(_)
            | Self::Ls(_)
            | Self::Glob(_)
            | Self::Grep(_) => DataCategory::File,
            Self::ExecuteStart(_) | Self::ExecuteFinish(_) => DataCategory::Command,
            Self::WebSearchStart(_)
            | Self::WebSearchFinish(_)
            | Self::HttpRequestStart(_)
            | Self::HttpRequestFinish(_)
            | Self::FetchUrlStart(_)
            | Self::FetchUrlFinish(_) => DataCategory::Web,
            Self::SubagentStart(_) | Self::SubagentStep(_) | Self::SubagentFinish(_) => {
                DataCategory::Subagent
            }
        }
    }

    /// One-line human readable description.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::TodosChanged(change) => format!("todos updated ({})", change.todos.len()),
            Self::FileWriteStart(file) => format!("writing {}", file.path),
            Self::FileWritten(file) => format!("wrote {} ({} bytes)", file.path, file.content.len()),
            Self::FileEdited(edit) => {
                format!("edited {} ({} occurrences)", edit.path, edit.occurrences)
            }
            Self::FileRead(read) => format!("read {} ({} lines)", read.path, read.lines),
            Self::Ls(ls) => format!("listed {} ({} entries)", ls.path, ls.count),
            Self::Glob(m) => format!("glob {} ({} matches)", m.pattern, m.count),
            Self::Grep(m) => format!("grep {} ({} matches)", m.pattern, m.count),
            Self::ExecuteStart(exec) => format!("$ {}", exec.command),
            Self::ExecuteFinish(exec) => match exec.exit_code {
                Some(code) => format!("$ {} exited with {code}", exec.command),
                None => format!("$ {} finished", exec.command),
            },
            Self::WebSearchStart(search) => format!("searching \"{}\"", search.query),
            Self::WebSearchFinish(search) => {
                format!("searched \"{}\" ({} results)", search.query, search.result_count)
            }
            Self::HttpRequestStart(req) => format!("{} {}", req.method, req.url),
            Self::HttpRequestFinish(req) => format!("{} -> {}", req.url, req.status_code),
            Self::FetchUrlStart(fetch) => format!("fetching {}", fetch.url),
            Self::FetchUrlFinish(fetch) => {
                let outcome = if fetch.success { "ok" } else { "failed" };
                format!("fetched {} ({outcome})", fetch.url)
            }
            Self::SubagentStart(sub) => format!("subagent {} started: {}", sub.name, sub.task),
            Self::SubagentStep(step) => format!(
                "subagent step {} ({} tool calls)",
                step.step_index,
                step.tool_calls.len()
            ),
            Self::SubagentFinish(sub) => format!("subagent {} finished", sub.name),
        }
    }
}
