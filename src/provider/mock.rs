//! Mock provider for tests. No real API calls — replays a scripted
//! sequence of text or tool-call responses.

use super::traits::*;
use crate::error::ProviderError;
use crate::types::*;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    ToolCalls(Vec<MockToolCall>),
}

#[derive(Debug, Clone)]
pub struct MockToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl MockToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Mock LLM provider for tests. Supply a sequence of responses; each
/// `stream()` call consumes the next one.
pub struct MockProvider {
    responses: std::sync::Mutex<Vec<MockResponse>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::Text(text.into())])
    }

    pub fn texts(texts: Vec<impl Into<String>>) -> Self {
        Self::new(texts.into_iter().map(|t| MockResponse::Text(t.into())).collect())
    }
}

#[async_trait]
impl StreamProvider for MockProvider {
    async fn stream(
        &self,
        _config: StreamConfig,
        tx: mpsc::UnboundedSender<StreamEvent>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<ModelMessage, ProviderError> {
        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                MockResponse::Text("(no more mock responses)".into())
            } else {
                responses.remove(0)
            }
        };

        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let _ = tx.send(StreamEvent::Start);

        let message = match response {
            MockResponse::Text(text) => {
                let _ = tx.send(StreamEvent::TextDelta {
                    delta: text.clone(),
                });
                ModelMessage::assistant(vec![ContentPart::Text { text }])
            }
            MockResponse::ToolCalls(calls) => {
                let parts: Vec<ContentPart> = calls
                    .iter()
                    .enumerate()
                    .map(|(i, call)| ContentPart::ToolCall {
                        id: format!("mock-tool-{}", i),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    })
                    .collect();
                ModelMessage::assistant(parts)
            }
        };

        let finish_reason = if message.content.tool_calls().is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolUse
        };
        let _ = tx.send(StreamEvent::Done {
            message: message.clone(),
            usage: Usage::default(),
            finish_reason,
        });
        Ok(message)
    }
}
