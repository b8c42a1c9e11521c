//! Terminal front end for the chat client.

use std::io::Write as _;

use agent_protocol::{QueueTodo, QueueTodoStatus, TaskStatus, TaskUiPart, WireEvent};
use tokio_util::sync::CancellationToken;

use crate::client::{ChatClient, TurnOutcome};
use crate::config::Provider;
use crate::core::session::SessionId;

/// Where a rendered event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Assistant text, streamed to stdout as-is.
    Text(String),
    /// Activity line for stderr.
    Activity(String),
}

/// Render one wire event for the terminal.
#[must_use]
pub fn render(event: &WireEvent) -> Option<Output> {
    match event {
        WireEvent::Text { text } => Some(Output::Text(text.clone())),
        WireEvent::TextDelta { delta, .. } => Some(Output::Text(delta.clone())),
        WireEvent::TextEnd { .. } => Some(Output::Text("\n".to_string())),
        WireEvent::ToolInputAvailable { tool_name, .. } => {
            Some(Output::Activity(format!("→ {tool_name}")))
        }
        WireEvent::ToolOutputError { error_text, .. } => {
            Some(Output::Activity(format!("✗ {error_text}")))
        }
        // Todos are printed once at the end of the turn
        WireEvent::Data(data) if data.name() == "todos-changed" => None,
        WireEvent::Data(data) => Some(Output::Activity(format!("· {}", data.summary()))),
        WireEvent::StartStep
        | WireEvent::FinishStep
        | WireEvent::TextStart { .. }
        | WireEvent::ToolOutputAvailable { .. }
        | WireEvent::Error { .. }
        | WireEvent::Finish { .. } => None,
    }
}

fn task_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::InProgress => "◐",
        TaskStatus::Completed => "●",
        TaskStatus::Error => "✗",
    }
}

/// One line per task.
#[must_use]
pub fn render_tasks(tasks: &[TaskUiPart]) -> Vec<String> {
    tasks
        .iter()
        .map(|task| format!("{} {} ({})", task_marker(task.status), task.tool_name, task.tool_call_id))
        .collect()
}

/// One checkbox line per todo.
#[must_use]
pub fn render_todos(todos: &[QueueTodo]) -> Vec<String> {
    todos
        .iter()
        .map(|todo| {
            let mark = match todo.status {
                QueueTodoStatus::Completed => "x",
                QueueTodoStatus::Pending => " ",
            };
            format!("[{mark}] {}", todo.title)
        })
        .collect()
}

/// Options for a one-shot chat turn.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub server: String,
    pub session: SessionId,
    pub provider: Option<Provider>,
    pub model: Option<String>,
}

/// Send `prompt`, stream the reply, then print tasks and todos.
pub async fn run(options: ChatOptions, prompt: &str, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut client = ChatClient::new(&options.server)?.with_session(options.session);

    if let Err(e) = client.fetch_server_config().await {
        tracing::warn!(error = %e, "could not fetch server config, using defaults");
    }
    if let Some(provider) = options.provider {
        client.settings_mut().set_provider(provider);
    }
    if let Some(model) = options.model {
        client.settings_mut().model = model;
    }
    let provider = client.settings().provider;
    if !client.settings().has_api_key(provider) {
        eprintln!("warning: no {provider} API key available on the server");
    }

    let outcome = client
        .send_message(prompt, &cancel, |event, _| match render(event) {
            Some(Output::Text(text)) => {
                print!("{text}");
                std::io::stdout().flush().ok();
            }
            Some(Output::Activity(line)) => eprintln!("  {line}"),
            None => {}
        })
        .await?;

    let tasks = client.tasks();
    if !tasks.is_empty() {
        eprintln!("\nTasks:");
        for line in render_tasks(&tasks) {
            eprintln!("  {line}");
        }
    }

    let todos = client.transcript().todos();
    if !todos.is_empty() {
        eprintln!("\nTodos:");
        for line in render_todos(todos) {
            eprintln!("  {line}");
        }
    }

    match outcome {
        TurnOutcome::Completed | TurnOutcome::Skipped => Ok(()),
        TurnOutcome::Aborted => {
            eprintln!("\naborted");
            Ok(())
        }
        TurnOutcome::Failed(message) => anyhow::bail!("agent error: {message}"),
    }
}

/// List the session's files, or print one.
pub async fn files(server: &str, session: SessionId, path: Option<&str>) -> anyhow::Result<()> {
    let mut client = ChatClient::new(server)?.with_session(session);

    if let Some(path) = path {
        print!("{}", client.read_file(path).await?);
        return Ok(());
    }

    for file in client.refresh_files().await? {
        println!("{file}");
    }
    Ok(())
}
