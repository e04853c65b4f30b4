//! Turn-loop framework for tool-using conversational agents: a streaming
//! event loop, mid-turn steering, and a branchable append-only session
//! history.
//!
//! Start with [`agent::Agent`] — bind a [`provider::StreamProvider`], a set
//! of [`tool::Tool`]s, a [`runtime::Runtime`], and a [`store::Store`], then
//! mint a [`session::Session`] and drive it with [`session::Session::send`].

pub mod agent;
pub mod error;
pub mod history;
pub mod loop_;
pub mod provider;
pub mod runtime;
pub mod session;
pub mod store;
pub mod tool;
pub mod tools;
pub mod types;

pub use agent::Agent;
pub use error::{AgentError, LoopError, ProviderError, RuntimeError, SessionError, StoreError, ToolExecError};
pub use history::{build_context, SessionEntry};
pub use loop_::{LoopConfig, LoopEvent, ToolCallDecision};
pub use runtime::{LocalRuntime, Runtime};
pub use session::{
    ListenerFn, ListenerId, SendMode, SendOptions, Session, SessionEvent, SessionEventKind,
};
pub use store::{InMemoryStore, JsonlStore, Store};
pub use tool::{Tool, ToolContext};
pub use types::*;
