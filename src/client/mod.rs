//! Chat client for the HTTP API.
//!
//! [`ChatClient`] owns one conversation: it sends each user turn with the
//! full history and the client settings, decodes the SSE reply and folds
//! every wire event into its [`Transcript`].

use agent_protocol::{
    Effect, Message, SseDecoder, SseFrame, TaskUiPart, Transcript, WireEvent,
};
use futures::StreamExt;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::{ErrorBody, FileList};
use crate::build_info;
use crate::config::{ClientSettings, ServerCapabilities};
use crate::core::session::SessionId;

/// Client-side errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid server url: {0}")]
    Url(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Where the conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    /// Request sent, no response yet.
    Submitted,
    /// Events are arriving.
    Streaming,
    Ready,
    Error,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    /// Cancelled through the token.
    Aborted,
    /// The agent reported an error.
    Failed(String),
    /// Empty input; nothing was sent.
    Skipped,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    messages: Vec<Message>,
    settings: &'a ClientSettings,
    session_id: &'a SessionId,
}

/// One conversation against an agent-chat server.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionId,
    settings: ClientSettings,
    transcript: Transcript,
    status: ChatStatus,
    error_message: Option<String>,
    files: Vec<String>,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Url(format!("{base_url}: {e}")))?;

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(build_info::user_agent())
                .build()?,
            base_url,
            session: SessionId::default(),
            settings: ClientSettings::default(),
            transcript: Transcript::new(),
            status: ChatStatus::Ready,
            error_message: None,
            files: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub const fn settings_mut(&mut self) -> &mut ClientSettings {
        &mut self.settings
    }

    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub const fn status(&self) -> ChatStatus {
        self.status
    }

    /// Last transport or agent error, cleared when the next turn starts.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Sandbox file listing as of the last refresh.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn tasks(&self) -> Vec<TaskUiPart> {
        self.transcript.derive_tasks()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Url(format!("{path}: {e}")))
    }

    /// Messages with at least one part, tool and activity parts included.
    fn history(&self) -> Vec<Message> {
        self.transcript
            .messages()
            .iter()
            .filter(|message| !message.parts.is_empty())
            .cloned()
            .collect()
    }

    /// Send one user turn and stream the reply into the transcript.
    ///
    /// `on_event` sees every applied wire event together with the updated
    /// transcript. Cancelling `cancel` stops reading and leaves the client
    /// ready, without an error.
    pub async fn send_message<F>(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&WireEvent, &Transcript),
    {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Skipped);
        }

        self.error_message = None;
        self.status = ChatStatus::Submitted;

        self.transcript.start_turn(text);
        let messages = self.history();

        let result = self.stream_turn(messages, cancel, &mut on_event).await;
        self.transcript.end_turn();

        match &result {
            Ok(TurnOutcome::Failed(message)) => {
                self.status = ChatStatus::Error;
                self.error_message = Some(message.clone());
            }
            Ok(outcome) => {
                tracing::debug!(?outcome, "turn ended");
                self.status = ChatStatus::Ready;
            }
            Err(e) => {
                tracing::warn!(error = %e, "turn failed");
                self.status = ChatStatus::Error;
                self.error_message = Some(e.to_string());
            }
        }

        result
    }

    async fn stream_turn<F>(
        &mut self,
        messages: Vec<Message>,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&WireEvent, &Transcript),
    {
        let url = self.endpoint("/api/chat")?;
        let body = ChatBody {
            messages,
            settings: &self.settings,
            session_id: &self.session,
        };
        let request = self.http.post(url).json(&body).send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(TurnOutcome::Aborted),
            response = request => check_status(response?).await?,
        };

        self.status = ChatStatus::Streaming;
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::<WireEvent>::new();
        let mut outcome = TurnOutcome::Completed;

        'read: loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(TurnOutcome::Aborted),
                chunk = bytes.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };

            for frame in decoder.push(&chunk?) {
                let SseFrame::Event(event) = frame else {
                    break 'read;
                };
                match self.dispatch(event, cancel, on_event).await {
                    Some(TurnOutcome::Aborted) => return Ok(TurnOutcome::Aborted),
                    Some(failed) => outcome = failed,
                    None => {}
                }
            }
        }

        if let Some(SseFrame::Event(event)) = decoder.finish() {
            match self.dispatch(event, cancel, on_event).await {
                Some(TurnOutcome::Aborted) => return Ok(TurnOutcome::Aborted),
                Some(failed) => outcome = failed,
                None => {}
            }
        }

        Ok(outcome)
    }

    /// Apply one event. Returns `Failed` for `error` events and `Aborted`
    /// when cancellation interrupts a file refresh.
    async fn dispatch<F>(
        &mut self,
        event: WireEvent,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> Option<TurnOutcome>
    where
        F: FnMut(&WireEvent, &Transcript),
    {
        let effect = self.transcript.apply(event.clone());
        on_event(&event, &self.transcript);

        match effect {
            Effect::RefreshFiles => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Some(TurnOutcome::Aborted),
                    refreshed = self.refresh_files() => {
                        if let Err(e) = refreshed {
                            tracing::warn!(error = %e, "file refresh failed");
                        }
                    }
                }
                None
            }
            Effect::Failed(message) => Some(TurnOutcome::Failed(message)),
            Effect::Finished(reason) => {
                tracing::debug!(?reason, "run finished");
                None
            }
            Effect::None => None,
        }
    }

    /// Ask the server which provider keys it holds and adopt them.
    pub async fn fetch_server_config(&mut self) -> Result<ServerCapabilities> {
        let url = self.endpoint("/api/config")?;
        let response = check_status(self.http.get(url).send().await?).await?;
        let capabilities: ServerCapabilities = response.json().await?;
        self.settings.apply_server_defaults(&capabilities);
        Ok(capabilities)
    }

    /// Re-list the session's sandbox files.
    pub async fn refresh_files(&mut self) -> Result<&[String]> {
        let url = self.endpoint(&format!("/api/sandboxes/{}/files", self.session))?;
        let response = check_status(self.http.get(url).send().await?).await?;
        let list: FileList = response.json().await?;
        tracing::debug!(files = list.files.len(), "file list refreshed");
        self.files = list.files;
        Ok(&self.files)
    }

    /// Fetch one file from the session's sandbox.
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let mut url = self.endpoint(&format!("/api/sandboxes/{}/files", self.session))?;
        url.query_pairs_mut().append_pair("path", path);
        let response = check_status(self.http.get(url).send().await?).await?;
        Ok(response.text().await?)
    }

    /// Drop the conversation, keeping settings and session.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.error_message = None;
        self.status = ChatStatus::Ready;
    }

    /// Drop activity parts, keeping text and tool parts.
    pub fn clear_events(&mut self) {
        self.transcript.clear_events();
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map_or_else(|_| format!("HTTP error! status: {}", status.as_u16()), |body| body.error);

    Err(ClientError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_protocol::Role;
    use axum::{
        Json, Router,
        http::StatusCode as AxumStatus,
        routing::{get, post},
    };

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn sse(body: &'static str) -> Router {
        Router::new()
            .route(
                "/api/chat",
                post(move || async move { ([("content-type", "text/event-stream")], body) }),
            )
            .route(
                "/api/sandboxes/{id}/files",
                get(|| async { Json(serde_json::json!({"files": ["a.txt"], "sandboxId": "default"})) }),
            )
    }

    #[tokio::test]
    async fn empty_input_is_skipped() {
        let mut client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let outcome = client
            .send_message("   ", &CancellationToken::new(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Skipped);
        assert!(client.transcript().messages().is_empty());
    }

    #[tokio::test]
    async fn nothing_after_done_is_dispatched() {
        let url = serve(sse(concat!(
            "data: {\"type\":\"text-start\",\"id\":\"t1\"}\n\n",
            "data: {\"type\":\"text-delta\",\"id\":\"t1\",\"delta\":\"Hi\"}\n\n",
            "data: {\"type\":\"text-end\",\"id\":\"t1\"}\n\n",
            "data: {\"type\":\"finish\",\"finishReason\":\"stop\"}\n\n",
            "data: [DONE]\n\n",
            "data: {\"type\":\"text-delta\",\"id\":\"t1\",\"delta\":\"late\"}\n\n",
        )))
        .await;

        let mut client = ChatClient::new(&url).unwrap();
        let mut seen = 0;
        let outcome = client
            .send_message("hello", &CancellationToken::new(), |_, _| seen += 1)
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(seen, 4);
        assert_eq!(client.status(), ChatStatus::Ready);
        let messages = client.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text(), "Hi");
        assert!(!client.transcript().is_generating());
    }

    #[tokio::test]
    async fn tool_output_refreshes_files() {
        let url = serve(sse(concat!(
            "data: {\"type\":\"tool-input-available\",\"toolCallId\":\"c1\",\"toolName\":\"write_file\",\"input\":{\"path\":\"a.txt\"}}\n\n",
            "data: {\"type\":\"tool-output-available\",\"toolCallId\":\"c1\",\"output\":\"ok\"}\n\n",
            "data: [DONE]\n\n",
        )))
        .await;

        let mut client = ChatClient::new(&url).unwrap();
        client
            .send_message("write it", &CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(client.files(), ["a.txt"]);
        let tasks = client.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].tool_name, "write_file");
    }

    #[tokio::test]
    async fn agent_error_sets_error_state() {
        let url = serve(sse(concat!(
            "data: {\"type\":\"error\",\"errorText\":\"model overloaded\"}\n\n",
            "data: [DONE]\n\n",
        )))
        .await;

        let mut client = ChatClient::new(&url).unwrap();
        let outcome = client
            .send_message("hi", &CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Failed("model overloaded".to_string()));
        assert_eq!(client.status(), ChatStatus::Error);
        assert_eq!(client.error_message(), Some("model overloaded"));
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let url = serve(Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({"error": "no agent backend configured"})),
                )
            }),
        ))
        .await;

        let mut client = ChatClient::new(&url).unwrap();
        let err = client
            .send_message("hi", &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Status { status, .. } if status.as_u16() == 503));
        assert_eq!(client.error_message(), Some("no agent backend configured"));
        assert_eq!(client.status(), ChatStatus::Error);
    }

    #[tokio::test]
    async fn bare_status_when_body_is_not_json() {
        let url = serve(Router::new().route(
            "/api/chat",
            post(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }),
        ))
        .await;

        let mut client = ChatClient::new(&url).unwrap();
        let _ = client
            .send_message("hi", &CancellationToken::new(), |_, _| {})
            .await;
        assert_eq!(client.error_message(), Some("HTTP error! status: 502"));
    }

    #[tokio::test]
    async fn cancelled_turn_is_silent() {
        let url = serve(sse("data: {\"type\":\"text\",\"text\":\"never\"}\n\n")).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut client = ChatClient::new(&url).unwrap();
        let outcome = client.send_message("hi", &cancel, |_, _| {}).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Aborted);
        assert_eq!(client.status(), ChatStatus::Ready);
        assert_eq!(client.error_message(), None);
        assert_eq!(client.transcript().messages()[1].text(), "");
    }

    #[test]
    fn history_skips_empty_messages() {
        let mut client = ChatClient::new("http://127.0.0.1:9").unwrap();
        client.transcript.start_turn("first");
        client.transcript.append_text("answer");
        client.transcript.end_turn();
        client.transcript.start_turn("second");

        let history = client.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text(), "answer");
    }

    #[test]
    fn history_keeps_tool_parts() {
        let mut client = ChatClient::new("http://127.0.0.1:9").unwrap();
        client.transcript.start_turn("run ls");
        client.transcript.append_text("Running.");
        client
            .transcript
            .append_tool_call("c1", "execute", serde_json::json!({"command": "ls"}));
        client
            .transcript
            .append_tool_result("c1", serde_json::json!("a.txt"), false);
        client.transcript.end_turn();

        let history = client.history();
        let body = serde_json::to_value(&history[1]).unwrap();
        let kinds: Vec<_> = body["parts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|part| part["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["text", "tool-call", "tool-result"]);
        assert_eq!(body["role"], "assistant");
    }

    #[tokio::test]
    async fn cancel_interrupts_a_hung_file_refresh() {
        let router = Router::new()
            .route(
                "/api/chat",
                post(|| async {
                    (
                        [("content-type", "text/event-stream")],
                        concat!(
                            "data: {\"type\":\"tool-output-available\",\"toolCallId\":\"c1\",\"output\":\"ok\"}\n\n",
                            "data: [DONE]\n\n",
                        ),
                    )
                }),
            )
            .route(
                "/api/sandboxes/{id}/files",
                get(|| std::future::pending::<Json<serde_json::Value>>()),
            );
        let url = serve(router).await;

        let mut client = ChatClient::new(&url).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.send_message("write", &cancel, |_, _| trigger.cancel()),
        )
        .await
        .expect("abort should not wait for the file listing")
        .unwrap();

        assert_eq!(outcome, TurnOutcome::Aborted);
        assert_eq!(client.status(), ChatStatus::Ready);
        assert!(client.files().is_empty());
    }
}
