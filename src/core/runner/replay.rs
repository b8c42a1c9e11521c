//! Agent that replays a recorded run.

use std::path::PathBuf;
use std::time::Duration;

use agent_protocol::AgentEvent;
use async_trait::async_trait;

use super::{AgentEventStream, AgentRunner, RunRequest};
use crate::core::error::Result;

/// Replays a JSON-lines file of agent events, one event per line.
///
/// The file is re-read for every run, so it can be edited while the server
/// is up. Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct ReplayAgent {
    path: PathBuf,
    delay: Duration,
}

impl ReplayAgent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delay: Duration::ZERO,
        }
    }

    /// Pause between events.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn parse_events(contents: &str) -> Vec<AgentEvent> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed replay line");
                None
            }
        })
        .collect()
}

#[async_trait]
impl AgentRunner for ReplayAgent {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn stream(&self, request: RunRequest) -> Result<AgentEventStream> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let events = parse_events(&contents);
        tracing::debug!(
            path = %self.path.display(),
            events = events.len(),
            messages = request.messages.len(),
            "replaying recorded run"
        );

        let delay = self.delay;
        let stream = async_stream::stream! {
            for event in events {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let terminal = event.is_terminal();
                yield Ok(event);
                if terminal {
                    break;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
