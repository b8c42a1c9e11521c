//! Server-side translation of agent events into wire events.
//!
//! The only state carried between events is the id of the currently open
//! text span. Every write happens in the order events are consumed.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::event::AgentEvent;
use crate::wire::{DataEvent, FinishReason, WireEvent};

/// Sink for wire events.
pub trait WireWriter {
    /// Emit one event.
    fn write(&mut self, event: WireEvent);

    /// Whether the receiving end has gone away.
    fn is_closed(&self) -> bool {
        false
    }
}

impl WireWriter for Vec<WireEvent> {
    fn write(&mut self, event: WireEvent) {
        self.push(event);
    }
}

/// Source of text span ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// What happens to the payload of the `text` event that opens a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpeningDelta {
    /// Emit it as a `text-delta` right after `text-start`.
    #[default]
    Emit,
    /// Drop it; only `text-start` is written. Matches older clients.
    Skip,
}

/// Whether the caller should keep pulling events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Result of mapping a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    /// The text span open after this event, if any.
    pub open_text: Option<String>,
    pub flow: Flow,
}

impl Mapped {
    const fn next(open_text: Option<String>) -> Self {
        Self {
            open_text,
            flow: Flow::Continue,
        }
    }

    const fn stop() -> Self {
        Self {
            open_text: None,
            flow: Flow::Stop,
        }
    }
}

/// Map one agent event onto `writer`.
pub fn map_event<W, G>(
    event: AgentEvent,
    writer: &mut W,
    ids: &mut G,
    open_text: Option<String>,
    opening: OpeningDelta,
) -> Mapped
where
    W: WireWriter + ?Sized,
    G: IdGenerator + ?Sized,
{
    let data = match event {
        AgentEvent::StepStart { .. } => {
            writer.write(WireEvent::StartStep);
            return Mapped::next(open_text);
        }
        AgentEvent::StepFinish { .. } => {
            writer.write(WireEvent::FinishStep);
            return Mapped::next(open_text);
        }
        AgentEvent::Text { text } => {
            let id = if let Some(id) = open_text {
                writer.write(WireEvent::TextDelta {
                    id: id.clone(),
                    delta: text,
                });
                id
            } else {
                let id = ids.next_id();
                writer.write(WireEvent::TextStart { id: id.clone() });
                if opening == OpeningDelta::Emit && !text.is_empty() {
                    writer.write(WireEvent::TextDelta {
                        id: id.clone(),
                        delta: text,
                    });
                }
                id
            };
            return Mapped::next(Some(id));
        }
        AgentEvent::ToolCall {
            tool_call_id,
            tool_name,
            args,
        } => {
            close_text(writer, open_text);
            writer.write(WireEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input: args,
            });
            return Mapped::next(None);
        }
        AgentEvent::ToolResult {
            tool_call_id,
            result,
            is_error,
            ..
        } => {
            if is_error {
                writer.write(WireEvent::ToolOutputError {
                    tool_call_id,
                    error_text: stringify(&result),
                });
            } else {
                writer.write(WireEvent::ToolOutputAvailable {
                    tool_call_id,
                    output: result,
                });
            }
            return Mapped::next(open_text);
        }
        AgentEvent::Error { error } => {
            close_text(writer, open_text);
            writer.write(WireEvent::Error {
                error_text: error.message,
            });
            return Mapped::stop();
        }
        AgentEvent::Done { .. } => {
            close_text(writer, open_text);
            writer.write(WireEvent::Finish {
                finish_reason: FinishReason::Stop,
            });
            return Mapped::stop();
        }
        AgentEvent::TodosChanged(p) => DataEvent::TodosChanged(p),
        AgentEvent::FileWriteStart(p) => DataEvent::FileWriteStart(p),
        AgentEvent::FileWritten(p) => DataEvent::FileWritten(p),
        AgentEvent::FileEdited(p) => DataEvent::FileEdited(p),
        AgentEvent::FileRead(p) => DataEvent::FileRead(p),
        AgentEvent::Ls(p) => DataEvent::Ls(p),
        AgentEvent::Glob(p) => DataEvent::Glob(p),
        AgentEvent::Grep(p) => DataEvent::Grep(p),
        AgentEvent::ExecuteStart(p) => DataEvent::ExecuteStart(p),
        AgentEvent::ExecuteFinish(p) => DataEvent::ExecuteFinish(p),
        AgentEvent::WebSearchStart(p) => DataEvent::WebSearchStart(p),
        AgentEvent::WebSearchFinish(p) => DataEvent::WebSearchFinish(p),
        AgentEvent::HttpRequestStart(p) => DataEvent::HttpRequestStart(p),
        AgentEvent::HttpRequestFinish(p) => DataEvent::HttpRequestFinish(p),
        AgentEvent::FetchUrlStart(p) => DataEvent::FetchUrlStart(p),
        AgentEvent::FetchUrlFinish(p) => DataEvent::FetchUrlFinish(p),
        AgentEvent::SubagentStart(p) => DataEvent::SubagentStart(p),
        AgentEvent::SubagentStep(p) => DataEvent::SubagentStep(p),
        AgentEvent::SubagentFinish(p) => DataEvent::SubagentFinish(p),
    };

    writer.write(WireEvent::Data(data));
    Mapped::next(open_text)
}

fn close_text<W: WireWriter + ?Sized>(writer: &mut W, open_text: Option<String>) {
    if let Some(id) = open_text {
        writer.write(WireEvent::TextEnd { id });
    }
}

/// Tool results are arbitrary JSON; errors travel as plain text.
fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Stateful wrapper around [`map_event`].
#[derive(Debug, Default)]
pub struct EventMapper<G = UuidIds> {
    ids: G,
    open_text: Option<String>,
    opening: OpeningDelta,
}

impl EventMapper {
    /// Create a mapper with random span ids.
    #[must_use]
    pub fn new(opening: OpeningDelta) -> Self {
        Self::with_ids(UuidIds, opening)
    }
}

impl<G: IdGenerator> EventMapper<G> {
    /// Create a mapper with a custom id source.
    pub const fn with_ids(ids: G, opening: OpeningDelta) -> Self {
        Self {
            ids,
            open_text: None,
            opening,
        }
    }

    /// Map one event, updating the open span.
    pub fn map<W: WireWriter + ?Sized>(&mut self, event: AgentEvent, writer: &mut W) -> Flow {
        let mapped = map_event(
            event,
            writer,
            &mut self.ids,
            self.open_text.take(),
            self.opening,
        );
        self.open_text = mapped.open_text;
        mapped.flow
    }

    /// Force-close the open text span, if any.
    pub fn close_text<W: WireWriter + ?Sized>(&mut self, writer: &mut W) {
        close_text(writer, self.open_text.take());
    }

    /// Id of the currently open text span.
    #[must_use]
    pub fn open_text(&self) -> Option<&str> {
        self.open_text.as_deref()
    }
}

/// How a [`drive`] loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The agent sent `done`.
    Finished,
    /// The agent sent `error`, or the event stream itself failed.
    Failed(String),
    /// The event stream ended without a terminal event.
    Exhausted,
    /// The writer's receiver went away.
    Disconnected,
}

/// Pump an agent event stream through `mapper` into `writer`.
///
/// One event is fully written before the next is pulled. A failing stream
/// closes any open text span before the terminal `error` is written.
pub async fn drive<S, E, G, W>(events: S, mapper: &mut EventMapper<G>, writer: &mut W) -> DriveOutcome
where
    S: Stream<Item = Result<AgentEvent, E>>,
    E: Display,
    G: IdGenerator,
    W: WireWriter + ?Sized,
{
    futures::pin_mut!(events);

    while let Some(item) = events.next().await {
        if writer.is_closed() {
            tracing::debug!("wire receiver closed, stopping agent stream");
            return DriveOutcome::Disconnected;
        }

        match item {
            Ok(event) => {
                let failure = match &event {
                    AgentEvent::Error { error } => Some(error.message.clone()),
                    _ => None,
                };
                tracing::trace!(kind = event.kind(), "mapping agent event");

                if mapper.map(event, writer) == Flow::Stop {
                    return failure.map_or(DriveOutcome::Finished, DriveOutcome::Failed);
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "agent stream failed");
                mapper.close_text(writer);
                writer.write(WireEvent::Error {
                    error_text: message.clone(),
                });
                return DriveOutcome::Failed(message);
            }
        }
    }

    mapper.close_text(writer);
    DriveOutcome::Exhausted
}
