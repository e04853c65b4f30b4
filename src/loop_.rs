//! The turn loop (§4.3): a cooperative coroutine modeled as a spawned task
//! crossed by two channels. `LoopHandle::next_event` pulls the next
//! `LoopEvent`; `LoopHandle::decide` answers the most recent `ToolCall`.
//!
//! This is the idiomatic stand-in for a bidirectional generator: Rust has
//! no stable coroutines, so the loop body runs as its own task and
//! communicates through `mpsc` in both directions instead of `yield`.

use crate::error::{LoopError, ProviderError};
use crate::provider::{StreamConfig, StreamEvent, StreamProvider, ToolDefinition};
use crate::runtime::Runtime;
use crate::tool::{Tool, ToolContext};
use crate::types::{FinishReason, ModelMessage, Usage};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Canonical reason recorded when a pending tool call is auto-denied
/// because the user steered mid-phase (§4.3 step 7, drain point 2).
pub const STEERING_DENY_REASON: &str = "Skipped: user sent a new message";

pub type GetMessagesFn = Arc<dyn Fn() -> Vec<ModelMessage> + Send + Sync>;

#[derive(Debug, Clone)]
pub enum LoopEvent {
    TextDelta {
        delta: String,
    },
    Message {
        message: ModelMessage,
    },
    ToolCall {
        call_id: String,
        name: String,
        args: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        name: String,
        result: String,
        is_error: bool,
        message: ModelMessage,
    },
    Step {
        usage: Usage,
        finish_reason: FinishReason,
    },
}

#[derive(Debug, Clone)]
pub enum ToolCallDecision {
    None,
    Deny(String),
    Override(serde_json::Value),
}

impl Default for ToolCallDecision {
    fn default() -> Self {
        Self::None
    }
}

pub struct LoopConfig {
    pub model: String,
    pub system_prompt: Option<String>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub runtime: Arc<dyn Runtime>,
    pub max_steps: usize,
    pub get_steering_messages: Option<GetMessagesFn>,
    pub get_follow_up_messages: Option<GetMessagesFn>,
}

/// Handle to a running loop task. Dropping it cancels nothing by itself —
/// callers hold the `CancellationToken` they passed to [`spawn`] for that.
pub struct LoopHandle {
    events: mpsc::Receiver<Result<LoopEvent, LoopError>>,
    decisions: mpsc::Sender<ToolCallDecision>,
}

impl LoopHandle {
    pub async fn next_event(&mut self) -> Option<Result<LoopEvent, LoopError>> {
        self.events.recv().await
    }

    /// Answers the most recently yielded `ToolCall` event. Must be called
    /// exactly once per `ToolCall`; the loop task awaits it before moving
    /// on to the next pending call.
    pub async fn decide(&self, decision: ToolCallDecision) {
        let _ = self.decisions.send(decision).await;
    }
}

/// Spawns the loop task and returns the driver-facing handle.
pub fn spawn(
    provider: Arc<dyn StreamProvider>,
    messages: Vec<ModelMessage>,
    config: LoopConfig,
    cancel: CancellationToken,
) -> LoopHandle {
    let (events_tx, events_rx) = mpsc::channel(32);
    let (decisions_tx, decisions_rx) = mpsc::channel(1);

    tokio::spawn(run(provider, messages, config, cancel, events_tx, decisions_rx));

    LoopHandle {
        events: events_rx,
        decisions: decisions_tx,
    }
}

async fn run(
    provider: Arc<dyn StreamProvider>,
    mut messages: Vec<ModelMessage>,
    config: LoopConfig,
    cancel: CancellationToken,
    events: mpsc::Sender<Result<LoopEvent, LoopError>>,
    mut decisions: mpsc::Receiver<ToolCallDecision>,
) {
    let tool_defs: Vec<ToolDefinition> = config
        .tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters_schema(),
        })
        .collect();
    let tools_by_name: HashMap<&str, &Arc<dyn Tool>> =
        config.tools.iter().map(|t| (t.name(), t)).collect();

    let mut step = 0usize;

    loop {
        step += 1;
        if step > config.max_steps || cancel.is_cancelled() {
            tracing::debug!(step, "turn loop terminating (step limit or cancellation)");
            return;
        }

        if let Some(get_steering) = &config.get_steering_messages {
            let drained = get_steering();
            messages.extend(drained);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
        let stream_config = StreamConfig {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            messages: messages.clone(),
            tools: tool_defs.clone(),
        };

        // The provider is awaited to completion first, then the channel is
        // drained — a streaming provider has already pushed every delta by
        // the time `stream()` resolves, so racing `rx.recv()` against the
        // future in a `select!` can lose events buffered on its first poll.
        let stream_result = provider.stream(stream_config, tx, cancel.clone()).await;

        let mut final_message: Option<ModelMessage> = None;
        let mut step_usage = Usage::default();
        let mut step_finish_reason: Option<FinishReason> = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                StreamEvent::TextDelta { delta } => {
                    if events.send(Ok(LoopEvent::TextDelta { delta })).await.is_err() {
                        return;
                    }
                }
                StreamEvent::Done { usage, finish_reason, .. } => {
                    step_usage = usage;
                    step_finish_reason = Some(finish_reason);
                }
                StreamEvent::Error { message } => {
                    final_message = Some(message);
                    step_finish_reason = Some(FinishReason::Error);
                }
                StreamEvent::Start | StreamEvent::ToolCallDelta { .. } => {}
            }
        }

        let assistant_message = match stream_result {
            Ok(message) => message,
            Err(ProviderError::Cancelled) => {
                tracing::debug!(step, "provider call cancelled mid-stream");
                return;
            }
            Err(err) => {
                tracing::warn!(step, error = %err, "provider call failed");
                let _ = events.send(Err(LoopError::Provider(err))).await;
                return;
            }
        };
        let assistant_message = final_message.unwrap_or(assistant_message);

        messages.push(assistant_message.clone());
        if events
            .send(Ok(LoopEvent::Message {
                message: assistant_message.clone(),
            }))
            .await
            .is_err()
        {
            return;
        }

        let tool_calls: Vec<(String, String, serde_json::Value)> = assistant_message
            .content
            .tool_calls()
            .into_iter()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        // Fall back to inferring Stop/ToolUse only if the provider never
        // reported a finish reason via `StreamEvent::Done`.
        let finish_reason = step_finish_reason.unwrap_or(if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolUse
        });
        if events
            .send(Ok(LoopEvent::Step {
                usage: step_usage,
                finish_reason,
            }))
            .await
            .is_err()
        {
            return;
        }

        if tool_calls.is_empty() {
            if let Some(get_follow_up) = &config.get_follow_up_messages {
                let drained = get_follow_up();
                if !drained.is_empty() {
                    messages.extend(drained);
                    continue;
                }
            }
            tracing::debug!(step, "turn loop finished: no tool calls, no follow-ups");
            return;
        }

        // Phase 1: collect decisions for each pending call, in order.
        let mut decided: Vec<(String, String, serde_json::Value, ToolCallDecision)> = Vec::new();
        let mut deferred_steering: Vec<ModelMessage> = Vec::new();
        let mut steered_away = false;

        for (call_id, name, args) in tool_calls.iter().cloned() {
            if !steered_away {
                if let Some(get_steering) = &config.get_steering_messages {
                    let drained = get_steering();
                    if !drained.is_empty() {
                        deferred_steering = drained;
                        steered_away = true;
                    }
                }
            }

            if steered_away {
                decided.push((
                    call_id,
                    name,
                    args,
                    ToolCallDecision::Deny(STEERING_DENY_REASON.to_string()),
                ));
                continue;
            }

            if !tools_by_name.contains_key(name.as_str()) {
                decided.push((call_id, name, args, ToolCallDecision::None));
                continue;
            }

            if events
                .send(Ok(LoopEvent::ToolCall {
                    call_id: call_id.clone(),
                    name: name.clone(),
                    args: args.clone(),
                }))
                .await
                .is_err()
            {
                return;
            }
            let decision = decisions.recv().await.unwrap_or_default();
            decided.push((call_id, name, args, decision));
        }

        // Phase 2: execute concurrently.
        let futures = decided.iter().map(|(call_id, name, args, decision)| {
            let call_id = call_id.clone();
            let name = name.clone();
            let tool = tools_by_name.get(name.as_str()).copied().cloned();
            let runtime = config.runtime.clone();
            let cancel = cancel.clone();
            let (exec_args, decision_outcome) = match decision {
                ToolCallDecision::Deny(reason) => (None, Some((reason.clone(), true))),
                ToolCallDecision::Override(v) => (Some(v.clone()), None),
                ToolCallDecision::None => (Some(args.clone()), None),
            };

            async move {
                if let Some((result, is_error)) = decision_outcome {
                    return (call_id, name, result, is_error);
                }
                let Some(tool) = tool else {
                    return (call_id, name.clone(), format!("Tool not found: {name}"), true);
                };
                let ctx = ToolContext { runtime, cancel };
                match tool.execute(exec_args.unwrap(), ctx).await {
                    Ok(result) => (call_id, name, result, false),
                    Err(err) => (call_id, name, err.to_string(), true),
                }
            }
        });
        let results = join_all(futures).await;

        // Phase 3: ordered result emission.
        for (call_id, name, result, is_error) in results {
            let message = ModelMessage::tool_result(call_id.clone(), name.clone(), result.clone());
            messages.push(message.clone());
            if events
                .send(Ok(LoopEvent::ToolResult {
                    call_id,
                    name,
                    result,
                    is_error,
                    message,
                }))
                .await
                .is_err()
            {
                return;
            }
        }

        if !deferred_steering.is_empty() {
            messages.extend(deferred_steering);
        }
    }
}
