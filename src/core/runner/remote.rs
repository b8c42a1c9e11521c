//! Agent service reached over HTTP.

use agent_protocol::{AgentEvent, SseFrame, decode_stream};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};

use super::{AgentEventStream, AgentRunner, RunRequest};
use crate::core::error::{Error, Result};
use crate::build_info;
use crate::core::secret::mask_secrets;

/// Posts run requests to an upstream service that answers with an SSE
/// stream of raw agent events.
#[derive(Debug, Clone)]
pub struct RemoteAgent {
    http: reqwest::Client,
    url: String,
}

impl RemoteAgent {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::Config("upstream agent url is empty".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(build_info::user_agent())
                .build()?,
            url,
        })
    }
}

#[async_trait]
impl AgentRunner for RemoteAgent {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn stream(&self, request: RunRequest) -> Result<AgentEventStream> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        tracing::debug!(
            url = %self.url,
            messages = request.messages.len(),
            provider = %request.settings.provider,
            "starting upstream run"
        );

        let response = self
            .http
            .post(&self.url)
            .headers(headers)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "upstream returned {}: {}",
                status.as_u16(),
                mask_secrets(body.trim())
            )));
        }

        let frames = decode_stream::<AgentEvent, _, _, _>(response.bytes_stream());

        let stream = async_stream::stream! {
            futures::pin_mut!(frames);

            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(SseFrame::Event(event)) => yield Ok(event),
                    Ok(SseFrame::Done) => break,
                    Err(e) => {
                        yield Err(Error::from(e));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
