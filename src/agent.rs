//! Factory that binds a provider, tools, runtime, and store, then mints
//! sessions (§4.6).

use crate::error::AgentError;
use crate::history::SessionEntry;
use crate::provider::StreamProvider;
use crate::runtime::{LocalRuntime, Runtime};
use crate::session::{Session, SessionParams, SendMode};
use crate::store::{InMemoryStore, Store};
use crate::tool::Tool;
use std::sync::Arc;

const DEFAULT_MAX_STEPS: usize = 100;

#[derive(Default)]
pub struct CreateSessionOptions {
    pub id: Option<String>,
    pub send_mode: Option<SendMode>,
}

#[derive(Default)]
pub struct ResumeOptions {
    pub send_mode: Option<SendMode>,
    pub leaf_id: Option<String>,
}

/// Builder for agents. Mirrors a constructor-plus-`with_*` chain rather
/// than a config-file loader — model name, tools, runtime, and store are
/// all plain arguments (§5.3).
pub struct Agent {
    provider: Arc<dyn StreamProvider>,
    model: String,
    system_prompt: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    runtime: Arc<dyn Runtime>,
    store: Arc<dyn Store>,
    max_steps: usize,
    default_send_mode: SendMode,
}

impl Agent {
    pub fn new(provider: impl StreamProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            model: String::new(),
            system_prompt: None,
            tools: Vec::new(),
            runtime: Arc::new(LocalRuntime::default()),
            store: Arc::new(InMemoryStore::new()),
            max_steps: DEFAULT_MAX_STEPS,
            default_send_mode: SendMode::Steer,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_runtime(mut self, runtime: impl Runtime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_send_mode(mut self, mode: SendMode) -> Self {
        self.default_send_mode = mode;
        self
    }

    pub fn create_session(&self, opts: CreateSessionOptions) -> Arc<Session> {
        let id = opts.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Session::new(SessionParams {
            id,
            provider: self.provider.clone(),
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            tools: self.tools.clone(),
            runtime: self.runtime.clone(),
            store: self.store.clone(),
            max_steps: self.max_steps,
            default_send_mode: opts.send_mode.unwrap_or(self.default_send_mode),
            entries: Vec::new(),
            leaf_entry_id: None,
        })
    }

    pub async fn resume_session(
        &self,
        id: impl Into<String>,
        opts: ResumeOptions,
    ) -> Result<Arc<Session>, AgentError> {
        let id = id.into();
        let entries = self.store.load(&id).await?;

        if entries.is_empty() && !self.store.exists(&id).await? {
            return Err(AgentError::SessionNotFound(id));
        }

        let leaf_entry_id = match opts.leaf_id {
            Some(requested) => {
                if !entries.iter().any(|e| e.id() == requested) {
                    return Err(AgentError::EntryNotFound(requested));
                }
                Some(requested)
            }
            None => entries.last().map(SessionEntry::id).map(str::to_string),
        };

        Ok(Session::new(SessionParams {
            id,
            provider: self.provider.clone(),
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            tools: self.tools.clone(),
            runtime: self.runtime.clone(),
            store: self.store.clone(),
            max_steps: self.max_steps,
            default_send_mode: opts.send_mode.unwrap_or(self.default_send_mode),
            entries,
            leaf_entry_id,
        }))
    }
}
