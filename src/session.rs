//! Session controller (§4.4): a non-blocking `send` scheduler with a
//! listener registry, steering/queue semantics, and an append-only history
//! DAG backed by a [`Store`].

use crate::error::SessionError;
use crate::history::{build_context, SessionEntry};
use crate::loop_::{self, LoopConfig, LoopEvent, ToolCallDecision};
use crate::provider::StreamProvider;
use crate::store::Store;
use crate::types::{now_ms, ModelMessage, Role};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Steer,
    Queue,
}

#[derive(Debug, Default, Clone)]
pub struct SendOptions {
    pub mode: Option<SendMode>,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    TextDelta { delta: String },
    Message { message: ModelMessage },
    ToolCall { call_id: String, name: String, args: serde_json::Value },
    ToolResult {
        call_id: String,
        name: String,
        result: String,
        is_error: bool,
        message: ModelMessage,
    },
    Step { usage: crate::types::Usage, finish_reason: crate::types::FinishReason },
    TurnEnd { messages: Vec<ModelMessage>, text: String },
    Error { error: SessionError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    TextDelta,
    Message,
    ToolCall,
    ToolResult,
    Step,
    TurnEnd,
    Error,
}

impl SessionEvent {
    fn kind(&self) -> SessionEventKind {
        match self {
            Self::TextDelta { .. } => SessionEventKind::TextDelta,
            Self::Message { .. } => SessionEventKind::Message,
            Self::ToolCall { .. } => SessionEventKind::ToolCall,
            Self::ToolResult { .. } => SessionEventKind::ToolResult,
            Self::Step { .. } => SessionEventKind::Step,
            Self::TurnEnd { .. } => SessionEventKind::TurnEnd,
            Self::Error { .. } => SessionEventKind::Error,
        }
    }
}

pub type ListenerId = u64;

type ListenerFut = Pin<Box<dyn Future<Output = Result<Option<ToolCallDecision>, String>> + Send>>;
pub type ListenerFn = Arc<dyn Fn(SessionEvent) -> ListenerFut + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<SessionEventKind, Vec<(ListenerId, ListenerFn)>>>,
}

impl ListenerRegistry {
    fn on(&self, kind: SessionEventKind, f: ListenerFn) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().entry(kind).or_default().push((id, f));
        id
    }

    fn off(&self, id: ListenerId) {
        let mut map = self.listeners.lock().unwrap();
        for listeners in map.values_mut() {
            listeners.retain(|(lid, _)| *lid != id);
        }
    }

    fn for_kind(&self, kind: SessionEventKind) -> Vec<(ListenerId, ListenerFn)> {
        self.listeners
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

type LatchResult = Option<Result<(), SessionError>>;

/// Drives a turn loop over a persisted, branchable history. Construct via
/// [`crate::agent::Agent::create_session`] or
/// [`crate::agent::Agent::resume_session`].
pub struct Session {
    id: String,
    provider: Arc<dyn StreamProvider>,
    model: String,
    system_prompt: Option<String>,
    tools: Vec<Arc<dyn crate::tool::Tool>>,
    runtime: Arc<dyn crate::runtime::Runtime>,
    store: Arc<dyn Store>,
    max_steps: usize,
    default_send_mode: SendMode,

    entries: Mutex<Vec<SessionEntry>>,
    leaf_entry_id: Mutex<Option<String>>,

    steering_queue: Arc<Mutex<Vec<ModelMessage>>>,
    follow_up_queue: Arc<Mutex<Vec<ModelMessage>>>,

    listeners: ListenerRegistry,
    latch: Mutex<Option<watch::Sender<LatchResult>>>,
    weak_self: std::sync::Weak<Session>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

pub(crate) struct SessionParams {
    pub id: String,
    pub provider: Arc<dyn StreamProvider>,
    pub model: String,
    pub system_prompt: Option<String>,
    pub tools: Vec<Arc<dyn crate::tool::Tool>>,
    pub runtime: Arc<dyn crate::runtime::Runtime>,
    pub store: Arc<dyn Store>,
    pub max_steps: usize,
    pub default_send_mode: SendMode,
    pub entries: Vec<SessionEntry>,
    pub leaf_entry_id: Option<String>,
}

impl Session {
    /// Sessions hold a `Weak` reference to themselves so `send` can spawn a
    /// loop-driving task without requiring callers to pass an `Arc` around
    /// by value on every call.
    pub(crate) fn new(params: SessionParams) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id: params.id,
            provider: params.provider,
            model: params.model,
            system_prompt: params.system_prompt,
            tools: params.tools,
            runtime: params.runtime,
            store: params.store,
            max_steps: params.max_steps,
            default_send_mode: params.default_send_mode,
            entries: Mutex::new(params.entries),
            leaf_entry_id: Mutex::new(params.leaf_entry_id),
            steering_queue: Arc::new(Mutex::new(Vec::new())),
            follow_up_queue: Arc::new(Mutex::new(Vec::new())),
            listeners: ListenerRegistry::default(),
            latch: Mutex::new(None),
            weak_self: weak.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn leaf_entry_id(&self) -> Option<String> {
        self.leaf_entry_id.lock().unwrap().clone()
    }

    /// Registers a listener for `kind`. Listeners are invoked in insertion
    /// order; only `ToolCall` listeners may return a decision, and the
    /// first to return `Some` wins (§4.4.1).
    pub fn on(&self, kind: SessionEventKind, f: ListenerFn) -> ListenerId {
        self.listeners.on(kind, f)
    }

    pub fn off(&self, id: ListenerId) {
        self.listeners.off(id);
    }

    /// Non-blocking. Starts a fresh turn if idle; otherwise enqueues onto
    /// the steering or follow-up queue per `opts.mode` (§4.4.2).
    pub fn send(&self, text: impl Into<String>, opts: SendOptions) {
        let message = ModelMessage::user(text);
        let mode = opts.mode.unwrap_or(self.default_send_mode);

        let running = self.latch.lock().unwrap().is_some();
        if !running {
            let (tx, _rx) = watch::channel(None);
            *self.latch.lock().unwrap() = Some(tx);
            let this = self
                .weak_self
                .upgrade()
                .expect("session outlives its own send() call");
            let cancel = opts.cancel.unwrap_or_else(CancellationToken::new);
            tokio::spawn(async move {
                this.run_loop(cancel, vec![message]).await;
            });
            return;
        }

        match mode {
            SendMode::Steer => self.steering_queue.lock().unwrap().push(message),
            SendMode::Queue => self.follow_up_queue.lock().unwrap().push(message),
        }
    }

    /// Resolves immediately if idle; otherwise awaits the current turn's
    /// completion latch (§4.4.3).
    pub async fn wait_for_idle(&self) -> Result<(), SessionError> {
        let mut watch_rx = {
            let guard = self.latch.lock().unwrap();
            let Some(tx) = guard.as_ref() else {
                return Ok(());
            };
            tx.subscribe()
        };
        loop {
            if let Some(result) = watch_rx.borrow().clone() {
                return result;
            }
            if watch_rx.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    fn append_entry(&self, message: ModelMessage) -> SessionEntry {
        let parent_id = self.leaf_entry_id.lock().unwrap().clone();
        let entry = SessionEntry::Message {
            id: Uuid::new_v4().to_string(),
            parent_id,
            timestamp: now_ms(),
            message,
        };
        self.entries.lock().unwrap().push(entry.clone());
        *self.leaf_entry_id.lock().unwrap() = Some(entry.id().to_string());
        entry
    }

    async fn emit(&self, event: SessionEvent) -> Result<Option<ToolCallDecision>, String> {
        let kind = event.kind();
        for (_, listener) in self.listeners.for_kind(kind) {
            match listener(event.clone()).await {
                Ok(Some(decision)) if kind == SessionEventKind::ToolCall => {
                    return Ok(Some(decision));
                }
                Ok(_) => {}
                Err(err) => {
                    if kind == SessionEventKind::Error {
                        tracing::warn!(error = %err, "error-listener itself failed; swallowing");
                    } else {
                        return Err(err);
                    }
                }
            }
        }
        Ok(None)
    }

    async fn run_loop(self: Arc<Self>, cancel: CancellationToken, initial_user_messages: Vec<ModelMessage>) {
        let mut turn_messages = Vec::new();
        let mut last_text = String::new();

        for message in initial_user_messages {
            let entry = self.append_entry(message.clone());
            if let SessionEntry::Message { message, .. } = &entry {
                let _ = self.store.append(&self.id, &entry).await;
                turn_messages.push(message.clone());
                let _ = self.emit(SessionEvent::Message { message: message.clone() }).await;
            }
        }

        let messages = build_context(&self.entries.lock().unwrap(), self.leaf_entry_id().as_deref());

        let steering_queue = self.steering_queue.clone();
        let follow_up_queue = self.follow_up_queue.clone();
        let pending_user_messages: Arc<Mutex<Vec<ModelMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let pending_for_steering = pending_user_messages.clone();
        let pending_for_follow_up = pending_user_messages.clone();
        let config = LoopConfig {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            tools: self.tools.clone(),
            runtime: self.runtime.clone(),
            max_steps: self.max_steps,
            get_steering_messages: Some(Arc::new(move || {
                let drained = std::mem::take(&mut *steering_queue.lock().unwrap());
                pending_for_steering.lock().unwrap().extend(drained.iter().cloned());
                drained
            })),
            get_follow_up_messages: Some(Arc::new(move || {
                let drained = std::mem::take(&mut *follow_up_queue.lock().unwrap());
                pending_for_follow_up.lock().unwrap().extend(drained.iter().cloned());
                drained
            })),
        };

        let mut handle = loop_::spawn(self.provider.clone(), messages, config, cancel);

        let result = loop {
            match handle.next_event().await {
                None => break Ok(()),
                Some(Err(err)) => break Err(SessionError::from(err)),
                Some(Ok(event)) => {
                    let drained = std::mem::take(&mut *pending_user_messages.lock().unwrap());
                    for message in drained {
                        let entry = self.append_entry(message.clone());
                        let _ = self.store.append(&self.id, &entry).await;
                        turn_messages.push(message.clone());
                        let _ = self.emit(SessionEvent::Message { message }).await;
                    }
                    if let Err(err) = self.dispatch(&mut turn_messages, &mut last_text, event, &handle).await {
                        break Err(SessionError::Listener(err));
                    }
                }
            }
        };

        match &result {
            Ok(()) => {
                let _ = self
                    .emit(SessionEvent::TurnEnd {
                        messages: turn_messages.clone(),
                        text: last_text.clone(),
                    })
                    .await;
            }
            Err(err) => {
                let _ = self.emit(SessionEvent::Error { error: err.clone() }).await;
            }
        }

        self.settle(result);
    }

    async fn dispatch(
        &self,
        turn_messages: &mut Vec<ModelMessage>,
        last_text: &mut String,
        event: LoopEvent,
        handle: &loop_::LoopHandle,
    ) -> Result<(), String> {
        match event {
            LoopEvent::TextDelta { delta } => {
                self.emit(SessionEvent::TextDelta { delta }).await?;
            }
            LoopEvent::Message { message } => {
                let entry = self.append_entry(message.clone());
                let _ = self.store.append(&self.id, &entry).await;
                turn_messages.push(message.clone());
                if message.role == Role::Assistant {
                    *last_text = message.text();
                }
                self.emit(SessionEvent::Message { message }).await?;
            }
            LoopEvent::ToolCall { call_id, name, args } => {
                let decision = self
                    .emit(SessionEvent::ToolCall {
                        call_id,
                        name,
                        args,
                    })
                    .await?
                    .unwrap_or_default();
                handle.decide(decision).await;
            }
            LoopEvent::ToolResult {
                call_id,
                name,
                result,
                is_error,
                message,
            } => {
                let entry = self.append_entry(message.clone());
                let _ = self.store.append(&self.id, &entry).await;
                turn_messages.push(message.clone());
                self.emit(SessionEvent::ToolResult {
                    call_id,
                    name,
                    result,
                    is_error,
                    message,
                })
                .await?;
            }
            LoopEvent::Step { usage, finish_reason } => {
                self.emit(SessionEvent::Step { usage, finish_reason }).await?;
            }
        }
        Ok(())
    }

    /// Atomically releases the current turn's waiters and clears queues
    /// (§4.4.5). New sends after this start a fresh turn.
    fn settle(&self, result: Result<(), SessionError>) {
        let latch = self.latch.lock().unwrap().take();
        self.steering_queue.lock().unwrap().clear();
        self.follow_up_queue.lock().unwrap().clear();
        if let Some(tx) = latch {
            let _ = tx.send(Some(result));
        }
    }
}
