//! Streaming client for the assistant backend.
//!
//! `StreamClient::consume` opens one long-lived request, decodes the framed
//! response as it arrives, and applies each chunk to the transcript in
//! receive order. Cancellation is cooperative: the token is checked at every
//! suspension point, and dropping the in-flight request aborts it.

use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::errors::{ChatError, ChatResult};
use crate::models::message::{Message, Role};
use crate::protocol::{Chunk, FrameParser};
use crate::transcript::Transcript;

/// Client for the assistant backend's streaming chat endpoint.
#[derive(Clone)]
pub struct StreamClient {
    http: Client,
    base_url: String,
}

impl StreamClient {
    pub fn new(base_url: impl Into<String>) -> ChatResult<Self> {
        // No overall timeout: response bodies are open-ended streams.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(StreamClient {
            http,
            base_url: base_url.into(),
        })
    }

    /// Open the streaming request and return the parsed chunk sequence.
    fn open(
        &self,
        prefix: &[Message],
        caller: &str,
    ) -> impl Stream<Item = ChatResult<Chunk>> + Send + 'static {
        let http = self.http.clone();
        let url = format!("{}/v1/chat/stream", self.base_url.trim_end_matches('/'));
        let body = json!({
            "messages": prefix,
            "address": caller,
        });

        try_stream! {
            let response = http.post(&url).json(&body).send().await?;
            let response = check_status(response).await?;

            let mut body = response.bytes_stream();
            let mut parser = FrameParser::new();
            while let Some(piece) = body.next().await {
                let piece: Bytes = piece?;
                for chunk in parser.feed(&piece)? {
                    yield chunk;
                }
            }
            if let Some(chunk) = parser.finish()? {
                yield chunk;
            }
        }
    }

    /// Stream one assistant turn into the transcript.
    ///
    /// The transcript must be non-empty and end with a user message. Applies
    /// exactly one transcript mutation per received chunk, in order. On
    /// cancellation the request is dropped and already-applied content stays
    /// in place; cancellation is not an error. Transport and decode failures
    /// propagate to the caller, which owns surfacing them.
    pub async fn consume(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
        caller: &str,
    ) -> ChatResult<()> {
        let prefix = transcript.messages();
        if !matches!(prefix.last().map(Message::role), Some(Role::User)) {
            return Err(ChatError::InvalidTranscript);
        }

        tracing::debug!(messages = prefix.len(), %caller, "opening stream");
        let mut chunks = Box::pin(self.open(&prefix, caller));
        let mut applier = ChunkApplier::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("stream cancelled by caller");
                    return Ok(());
                }
                next = chunks.next() => match next {
                    Some(Ok(chunk)) => {
                        if applier.apply(transcript, chunk) {
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "stream failed");
                        return Err(e);
                    }
                    // Stream closure without a done frame is a clean end.
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Consume a non-success response into a status error; pass the response
/// through untouched otherwise.
async fn check_status(response: reqwest::Response) -> ChatResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Status { status, body })
}

/// Applies chunks to the transcript, tracking whether an assistant message
/// is currently in progress so deltas merge while later bubbles start fresh.
struct ChunkApplier {
    assistant_open: bool,
}

impl ChunkApplier {
    fn new() -> Self {
        ChunkApplier {
            assistant_open: false,
        }
    }

    /// Apply one chunk. Returns true when the stream is terminal.
    fn apply(&mut self, transcript: &Transcript, chunk: Chunk) -> bool {
        match chunk {
            Chunk::TextDelta(delta) => {
                if self.assistant_open {
                    transcript.replace_last(
                        |m| m.is_assistant(),
                        |m| m.push_text(&delta),
                        || Message::assistant(delta.clone()),
                    );
                } else {
                    transcript.append(Message::assistant(delta));
                    self.assistant_open = true;
                }
                false
            }
            Chunk::ToolCall { id, name, args } => {
                transcript.append(Message::tool(id, name, args));
                self.assistant_open = false;
                false
            }
            Chunk::ToolResult { id, params } => {
                transcript.replace_last(
                    |m| m.is_tool_with_id(&id),
                    |m| m.merge_params(params.clone()),
                    || {
                        // Result for a call we never saw; surface it anyway.
                        let mut message =
                            Message::tool(id.clone(), String::new(), serde_json::Value::Null);
                        message.merge_params(params.clone());
                        message
                    },
                );
                self.assistant_open = false;
                false
            }
            Chunk::Error(text) => {
                transcript.append(Message::error(text));
                true
            }
            Chunk::Done { finish_reason } => {
                tracing::debug!(%finish_reason, "stream finished");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageBody;
    use crate::models::params::{ParameterValue, Params};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn apply_all(chunks: Vec<Chunk>) -> Transcript {
        let transcript = Transcript::new();
        transcript.append(Message::user("hi"));
        let mut applier = ChunkApplier::new();
        for chunk in chunks {
            applier.apply(&transcript, chunk);
        }
        transcript
    }

    #[test]
    fn text_deltas_merge_into_one_assistant_message() {
        let transcript = apply_all(vec![
            Chunk::TextDelta("Hel".to_string()),
            Chunk::TextDelta("lo".to_string()),
        ]);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content(), Some("Hello"));
    }

    #[test]
    fn tool_call_closes_the_assistant_message() {
        let transcript = apply_all(vec![
            Chunk::TextDelta("Submitting".to_string()),
            Chunk::ToolCall {
                id: "call-1".to_string(),
                name: "transfer".to_string(),
                args: json!({"amount": "100"}),
            },
            Chunk::TextDelta("Done".to_string()),
        ]);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content(), Some("Submitting"));
        assert!(messages[2].is_tool_with_id("call-1"));
        assert_eq!(messages[3].content(), Some("Done"));
    }

    #[test]
    fn tool_result_merges_into_matching_call() {
        let mut params = Params::new();
        params.insert("status", ParameterValue::text("Success"));

        let transcript = apply_all(vec![
            Chunk::ToolCall {
                id: "call-1".to_string(),
                name: "transfer".to_string(),
                args: json!({}),
            },
            Chunk::ToolResult {
                id: "call-1".to_string(),
                params,
            },
        ]);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        match &messages[1].body {
            MessageBody::Tool { params, .. } => {
                assert_eq!(params.get("status").unwrap().as_text(), Some("Success"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn orphan_tool_result_appends_a_tool_message() {
        let mut params = Params::new();
        params.insert("block", ParameterValue::block(42));

        let transcript = apply_all(vec![Chunk::ToolResult {
            id: "call-9".to_string(),
            params,
        }]);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_tool_with_id("call-9"));
    }

    #[test]
    fn error_chunk_is_terminal() {
        let transcript = Transcript::new();
        transcript.append(Message::user("hi"));
        let mut applier = ChunkApplier::new();
        assert!(applier.apply(&transcript, Chunk::Error("boom".to_string())));
        assert_eq!(transcript.last().unwrap().role(), Role::Error);
    }

    #[tokio::test]
    async fn consume_requires_user_tail() {
        let client = StreamClient::new("http://localhost:0").unwrap();
        let transcript = Transcript::new();
        let cancel = CancellationToken::new();

        let err = client.consume(&transcript, &cancel, "0x0").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidTranscript));

        transcript.append(Message::assistant("hello"));
        let err = client.consume(&transcript, &cancel, "0x0").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidTranscript));
    }

    #[tokio::test]
    async fn consume_applies_frames_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "0:\"Transferring\"\n",
            "9:{\"toolCallId\":\"call-1\",\"toolName\":\"transfer\",\"args\":{}}\n",
            "a:{\"toolCallId\":\"call-1\",\"result\":{\"status\":{\"type\":\"string\",\"value\":\"Success\"}}}\n",
            "0:\"All done\"\n",
            "d:{\"finishReason\":\"stop\"}\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = StreamClient::new(server.uri()).unwrap();
        let transcript = Transcript::new();
        transcript.append(Message::user("send 1 APT"));

        client
            .consume(&transcript, &CancellationToken::new(), "0x0")
            .await
            .unwrap();

        let messages = transcript.messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role()).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(messages[1].content(), Some("Transferring"));
        assert_eq!(messages[3].content(), Some("All done"));
    }

    #[tokio::test]
    async fn consume_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
            .mount(&server)
            .await;

        let client = StreamClient::new(server.uri()).unwrap();
        let transcript = Transcript::new();
        transcript.append(Message::user("hi"));

        let err = client
            .consume(&transcript, &CancellationToken::new(), "0x0")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Status { status, .. } if status.as_u16() == 500));
        // The failed stream applied nothing.
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn cancelling_stops_mutation_and_returns_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("0:\"never applied\"\n")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let client = StreamClient::new(server.uri()).unwrap();
        let transcript = Transcript::new();
        transcript.append(Message::user("hi"));

        let cancel = CancellationToken::new();
        let handle = {
            let client = client.clone();
            let transcript = transcript.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { client.consume(&transcript, &cancel, "0x0").await })
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("consume should return promptly after cancel")
            .unwrap()
            .unwrap();

        assert_eq!(transcript.len(), 1);
    }
}
