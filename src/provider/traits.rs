//! Language-model transport interface (§6). No concrete backend ships in
//! this crate — bind a provider adapter at the application layer and pass
//! it into [`crate::agent::Agent::new`].

use crate::error::ProviderError;
use crate::types::{FinishReason, ModelMessage, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Events emitted while a model response streams in. Transport-level deltas
/// the loop doesn't care about (thinking, raw tool-call JSON fragments) are
/// free for an adapter to emit too — the loop only matches on these.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Start,
    TextDelta { delta: String },
    ToolCallDelta { delta: String },
    Done {
        message: ModelMessage,
        usage: Usage,
        finish_reason: FinishReason,
    },
    Error { message: ModelMessage },
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// Tool schema sent to the model — no `execute` function, just the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The core provider trait. Implement this for each LLM backend.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Stream a completion, forwarding events through `tx`, and return the
    /// final assistant message once the stream completes.
    async fn stream(
        &self,
        config: StreamConfig,
        tx: mpsc::UnboundedSender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<ModelMessage, ProviderError>;
}
