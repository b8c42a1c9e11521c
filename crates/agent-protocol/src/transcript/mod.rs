//! Client-side conversation state.
//!
//! A [`Transcript`] owns the message list of one conversation. Wire events
//! are folded into the assistant message under construction (the cursor),
//! which is always the last message. Task and todo views are derived on
//! demand and never stored.

mod part;
mod task;
mod todo;

pub use part::{EventPart, Message, Part, Role};
pub use task::{TaskItem, TaskItemKind, TaskStatus, TaskUiPart};
pub use todo::{QueueTodo, QueueTodoStatus};

use serde_json::Value;

use crate::event::TodoItem;
use crate::wire::{DataEvent, FinishReason, WireEvent};

/// Side effect requested by an applied wire event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// A tool finished; the file listing may be stale.
    RefreshFiles,
    Finished(FinishReason),
    Failed(String),
}

fn message_id() -> String {
    format!("msg_{}", ulid::Ulid::new())
}

/// Messages plus the derived todo view of a single conversation.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    cursor: Option<String>,
    todos: Vec<QueueTodo>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn todos(&self) -> &[QueueTodo] {
        &self.todos
    }

    /// Whether a turn is in progress.
    #[must_use]
    pub const fn is_generating(&self) -> bool {
        self.cursor.is_some()
    }

    /// Append the user's message and an empty assistant message to fill.
    ///
    /// Returns the assistant message id.
    pub fn start_turn(&mut self, user_text: &str) -> String {
        self.messages.push(Message::user(message_id(), user_text));
        let id = message_id();
        self.messages.push(Message::assistant(id.clone()));
        self.cursor = Some(id.clone());
        id
    }

    /// Stop accepting events for the current turn.
    pub fn end_turn(&mut self) {
        self.cursor = None;
    }

    fn current(&mut self) -> Option<&mut Message> {
        let cursor = self.cursor.as_deref()?;
        match self.messages.last_mut() {
            Some(message) if message.id == cursor => Some(message),
            _ => {
                tracing::warn!(cursor, "cursor does not point at the last message");
                None
            }
        }
    }

    fn with_current(&mut self, kind: &str, f: impl FnOnce(&mut Message)) {
        if let Some(message) = self.current() {
            f(message);
        } else {
            tracing::warn!(kind, "dropping event outside of a turn");
        }
    }

    /// Extend the trailing text part, or start a new one.
    pub fn append_text(&mut self, delta: &str) {
        self.with_current("text", |message| {
            if let Some(Part::Text { text }) = message.parts.last_mut() {
                text.push_str(delta);
            } else {
                message.parts.push(Part::Text {
                    text: delta.to_string(),
                });
            }
        });
    }

    pub fn append_tool_call(&mut self, tool_call_id: &str, tool_name: &str, args: Value) {
        self.with_current("tool-call", |message| {
            message.parts.push(Part::ToolCall {
                tool_call_id: tool_call_id.to_string(),
                tool_name: tool_name.to_string(),
                args,
            });
        });
    }

    /// Append a tool result, naming it after its call when one exists.
    pub fn append_tool_result(&mut self, tool_call_id: &str, result: Value, is_error: bool) {
        let tool_name = self.tool_name(tool_call_id);
        if tool_name.is_none() {
            tracing::debug!(tool_call_id, "tool result without a matching call");
        }
        self.with_current("tool-result", |message| {
            message.parts.push(Part::ToolResult {
                tool_call_id: tool_call_id.to_string(),
                tool_name,
                result,
                is_error,
            });
        });
    }

    fn tool_name(&self, tool_call_id: &str) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .flat_map(|m| m.parts.iter().rev())
            .find_map(|part| match part {
                Part::ToolCall {
                    tool_call_id: id,
                    tool_name,
                    ..
                } if id == tool_call_id => Some(tool_name.clone()),
                _ => None,
            })
    }

    /// Record an activity event, stamped with the current time.
    pub fn append_event_part(&mut self, event: DataEvent) {
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.with_current(event.name(), |message| {
            message.parts.push(Part::Event(EventPart { event, timestamp }));
        });
    }

    pub fn replace_todos(&mut self, todos: &[TodoItem]) {
        self.todos = todo::queue_todos(todos);
    }

    /// One task per tool call, in call order.
    #[must_use]
    pub fn derive_tasks(&self) -> Vec<TaskUiPart> {
        task::derive_tasks(&self.messages, self.is_generating())
    }

    /// Drop all messages and todos.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.todos.clear();
        self.cursor = None;
    }

    /// Drop every event part, keeping text and tool parts.
    pub fn clear_events(&mut self) {
        for message in &mut self.messages {
            message.parts.retain(|p| !p.is_event());
        }
    }

    /// Fold one wire event into the transcript.
    pub fn apply(&mut self, event: WireEvent) -> Effect {
        match event {
            WireEvent::Text { text: delta } | WireEvent::TextDelta { delta, .. } => {
                self.append_text(&delta);
            }
            WireEvent::TextStart { .. }
            | WireEvent::TextEnd { .. }
            | WireEvent::StartStep
            | WireEvent::FinishStep => {}
            WireEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => self.append_tool_call(&tool_call_id, &tool_name, input),
            WireEvent::ToolOutputAvailable {
                tool_call_id,
                output,
            } => {
                self.append_tool_result(&tool_call_id, output, false);
                return Effect::RefreshFiles;
            }
            WireEvent::ToolOutputError {
                tool_call_id,
                error_text,
            } => {
                self.append_tool_result(&tool_call_id, Value::String(error_text), true);
                return Effect::RefreshFiles;
            }
            WireEvent::Data(DataEvent::TodosChanged(change)) => {
                if self.is_generating() {
                    self.replace_todos(&change.todos);
                } else {
                    tracing::warn!("dropping todos-changed outside of a turn");
                }
            }
            WireEvent::Data(data) => {
                tracing::debug!(name = data.name(), category = ?data.category(), "activity");
                self.append_event_part(data);
            }
            WireEvent::Error { error_text } => return Effect::Failed(error_text),
            WireEvent::Finish { finish_reason } => return Effect::Finished(finish_reason),
        }
        Effect::None
    }
}
