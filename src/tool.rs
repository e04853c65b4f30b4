//! Tool contract — a pure description plus an `execute` function, stateless
//! with respect to the turn loop (§4.1).

use crate::error::ToolExecError;
use crate::runtime::Runtime;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Supplied to every `execute` call: the side-effect boundary and a
/// cancellation token scoped to this one invocation.
pub struct ToolContext {
    pub runtime: Arc<dyn Runtime>,
    pub cancel: CancellationToken,
}

/// A tool the agent can call. `execute` returning `Ok` is the tool result
/// surfaced to the model; `Err` is converted to an error tool-result by the
/// loop (§4.3 Phase 2) — it is never fatal to the turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;
    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError>;
}
