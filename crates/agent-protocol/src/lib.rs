//! Agent event stream protocol.
//!
//! Two translators and one accumulator:
//!
//! ```text
//! AgentEvent ──► mapper ──► WireEvent ──► SSE bytes
//!                                            │
//!                Transcript ◄── sse decoder ◄┘
//! ```
//!
//! - [`mapper`] folds the agent's lifecycle events into the wire vocabulary,
//!   bracketing runs of text in `text-start`/`text-end` spans.
//! - [`sse`] splits an incremental byte stream into JSON events.
//! - [`transcript`] owns the message list and derives the task and todo views.

pub mod error;
pub mod event;
pub mod mapper;
pub mod sse;
pub mod transcript;
pub mod wire;

pub use error::{ProtocolError, Result};
pub use event::{
    AgentEvent, ErrorDetail, ExecuteFinish, ExecuteStart, FetchUrlFinish, FetchUrlStart,
    FileContent, FileEdited, FileRead, HttpRequestFinish, HttpRequestStart, ListDir, PatternMatch,
    SubagentFinish, SubagentStart, SubagentStep, SubagentToolCall, TodoItem, TodoStatus,
    TodosChanged, WebSearchFinish, WebSearchStart,
};
pub use mapper::{DriveOutcome, EventMapper, drive, Flow, IdGenerator, OpeningDelta, UuidIds, WireWriter};
pub use sse::{DONE_SENTINEL, SseDecoder, SseFrame, decode_stream};
pub use transcript::{
    Effect, EventPart, Message, Part, QueueTodo, QueueTodoStatus, Role, TaskItem, TaskItemKind,
    TaskStatus, TaskUiPart, Transcript,
};
pub use wire::{DataCategory, DataEvent, FinishReason, WireEvent};
