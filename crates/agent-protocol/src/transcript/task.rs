//! Task view derived from tool calls and results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::part::{Message, Part, Role};

/// Lifecycle of a tool call as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskItemKind {
    Input,
    Processing,
    Result,
    Error,
}

/// One line of detail under a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(rename = "type")]
    pub kind: TaskItemKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TaskItem {
    fn new(kind: TaskItemKind, value: &Value) -> Self {
        Self {
            kind,
            content: display(value),
            data: Some(value.clone()),
        }
    }
}

/// A tool call with everything known about its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUiPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub status: TaskStatus,
    pub items: Vec<TaskItem>,
}

const RUNNING: &str = "Running...";

/// Strings are shown as-is; anything else as pretty JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// A call and the latest result seen after it.
struct Pairing<'a> {
    tool_call_id: &'a str,
    tool_name: &'a str,
    args: &'a Value,
    result: Option<(&'a Value, bool)>,
}

/// Build one task per tool call across every assistant message.
///
/// Tasks are ordered by first appearance of the call. A repeated call
/// replaces the earlier one in place and drops its result. A result pairs
/// only with a call already seen; a later result replaces an earlier one.
pub(crate) fn derive_tasks(messages: &[Message], generating: bool) -> Vec<TaskUiPart> {
    let mut pairings: Vec<Pairing<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    let parts = messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .flat_map(|m| m.parts.iter());

    for part in parts {
        match part {
            Part::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => {
                let pairing = Pairing {
                    tool_call_id,
                    tool_name,
                    args,
                    result: None,
                };
                match index.get(tool_call_id.as_str()) {
                    Some(&at) => pairings[at] = pairing,
                    None => {
                        index.insert(tool_call_id, pairings.len());
                        pairings.push(pairing);
                    }
                }
            }
            Part::ToolResult {
                tool_call_id,
                result,
                is_error,
                ..
            } => {
                if let Some(&at) = index.get(tool_call_id.as_str()) {
                    pairings[at].result = Some((result, *is_error));
                }
            }
            Part::Text { .. } | Part::Event(_) => {}
        }
    }

    pairings
        .into_iter()
        .map(|pairing| to_task(&pairing, generating))
        .collect()
}

fn to_task(pairing: &Pairing<'_>, generating: bool) -> TaskUiPart {
    let mut items = Vec::new();
    if !pairing.args.is_null() {
        items.push(TaskItem::new(TaskItemKind::Input, pairing.args));
    }

    let status = match pairing.result {
        Some((result, true)) => {
            items.push(TaskItem::new(TaskItemKind::Error, result));
            TaskStatus::Error
        }
        Some((result, false)) => {
            items.push(TaskItem::new(TaskItemKind::Result, result));
            TaskStatus::Completed
        }
        None if generating => {
            items.push(TaskItem {
                kind: TaskItemKind::Processing,
                content: RUNNING.to_string(),
                data: None,
            });
            TaskStatus::InProgress
        }
        None => TaskStatus::Pending,
    };

    TaskUiPart {
        tool_call_id: pairing.tool_call_id.to_string(),
        tool_name: pairing.tool_name.to_string(),
        status,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, args: Value) -> Part {
        Part::ToolCall {
            tool_call_id: id.to_string(),
            tool_name: "execute".to_string(),
            args,
        }
    }

    fn result(id: &str, value: Value, is_error: bool) -> Part {
        Part::ToolResult {
            tool_call_id: id.to_string(),
            tool_name: Some("execute".to_string()),
            result: value,
            is_error,
        }
    }

    fn assistant(parts: Vec<Part>) -> Message {
        Message {
            id: "m".to_string(),
            role: Role::Assistant,
            parts,
        }
    }

    #[test]
    fn completed_task_has_input_and_result() {
        let messages = vec![assistant(vec![
            call("c1", json!({"command": "ls"})),
            result("c1", json!("a.txt"), false),
        ])];
        let tasks = derive_tasks(&messages, false);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        let kinds: Vec<_> = tasks[0].items.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![TaskItemKind::Input, TaskItemKind::Result]);
        assert_eq!(tasks[0].items[1].content, "a.txt");
        assert!(tasks[0].items[0].content.contains("\"command\": \"ls\""));
    }

    #[test]
    fn error_task_keeps_input_and_adds_one_error_item() {
        let messages = vec![assistant(vec![
            call("c1", json!({"command": "false"})),
            result("c1", json!("exit 1"), true),
        ])];
        let tasks = derive_tasks(&messages, true);

        assert_eq!(tasks[0].status, TaskStatus::Error);
        let kinds: Vec<_> = tasks[0].items.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![TaskItemKind::Input, TaskItemKind::Error]);
        assert_eq!(
            tasks[0].items[1],
            TaskItem {
                kind: TaskItemKind::Error,
                content: "exit 1".to_string(),
                data: Some(json!("exit 1")),
            }
        );
    }

    #[test]
    fn result_before_its_call_is_not_paired() {
        let messages = vec![assistant(vec![
            result("c1", json!("early"), false),
            call("c1", json!({"command": "ls"})),
        ])];

        let tasks = derive_tasks(&messages, false);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].items.len(), 1);
        assert_eq!(tasks[0].items[0].kind, TaskItemKind::Input);
    }

    #[test]
    fn later_result_replaces_earlier_one() {
        let messages = vec![assistant(vec![
            call("c1", Value::Null),
            result("c1", json!("failed"), true),
            result("c1", json!("retried"), false),
        ])];

        let tasks = derive_tasks(&messages, false);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[0].items.len(), 1);
        assert_eq!(tasks[0].items[0].content, "retried");
    }

    #[test]
    fn repeated_call_replaces_in_place() {
        let messages = vec![assistant(vec![
            call("c1", json!("first")),
            result("c1", json!("done"), false),
            call("c2", Value::Null),
            Part::ToolCall {
                tool_call_id: "c1".to_string(),
                tool_name: "read_file".to_string(),
                args: json!("second"),
            },
        ])];

        let tasks = derive_tasks(&messages, false);
        let ids: Vec<_> = tasks.iter().map(|t| t.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(tasks[0].tool_name, "read_file");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].items[0].content, "second");
    }

    #[test]
    fn unresolved_call_depends_on_generation() {
        let messages = vec![assistant(vec![call("c1", Value::Null)])];

        let running = derive_tasks(&messages, true);
        assert_eq!(running[0].status, TaskStatus::InProgress);
        assert_eq!(running[0].items.len(), 1);
        assert_eq!(running[0].items[0].content, "Running...");

        let idle = derive_tasks(&messages, false);
        assert_eq!(idle[0].status, TaskStatus::Pending);
        assert!(idle[0].items.is_empty());
    }

    #[test]
    fn orphan_results_are_ignored() {
        let messages = vec![assistant(vec![result("ghost", json!(1), false)])];
        assert!(derive_tasks(&messages, false).is_empty());
    }

    #[test]
    fn tasks_span_messages_in_call_order() {
        let messages = vec![
            assistant(vec![call("b", Value::Null)]),
            Message::user("u", "continue"),
            assistant(vec![call("a", Value::Null), result("b", json!(true), false)]),
        ];
        let tasks = derive_tasks(&messages, false);
        let ids: Vec<_> = tasks.iter().map(|t| t.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
    }

    #[test]
    fn task_item_serializes_kind_as_type() {
        let item = TaskItem {
            kind: TaskItemKind::Processing,
            content: "Running...".to_string(),
            data: None,
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"type": "processing", "content": "Running..."})
        );
    }
}
