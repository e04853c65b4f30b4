//! Bash tool — execute shell commands with timeout and output capture.

use crate::error::ToolExecError;
use crate::runtime::ExecOptions;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;
use std::time::Duration;

/// Type alias for command confirmation callback.
pub type ConfirmFn = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Execute shell commands via the tool's [`crate::runtime::Runtime`].
pub struct BashTool {
    /// Max execution time per command.
    pub timeout: Duration,
    /// Max output bytes to capture (prevents OOM on huge outputs).
    pub max_output_bytes: usize,
    /// Commands/patterns that are always blocked (e.g., "rm -rf /").
    pub deny_patterns: Vec<String>,
    /// Optional callback for confirming dangerous commands.
    pub confirm_fn: Option<ConfirmFn>,
}

impl Default for BashTool {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_output_bytes: 256 * 1024,
            deny_patterns: vec![
                "rm -rf /".into(),
                "rm -rf /*".into(),
                "mkfs".into(),
                "dd if=".into(),
                ":(){:|:&};:".into(),
            ],
            confirm_fn: None,
        }
    }
}

impl BashTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_deny_patterns(mut self, patterns: Vec<String>) -> Self {
        self.deny_patterns = patterns;
        self
    }

    pub fn with_confirm(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirm_fn = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a bash command and return stdout/stderr. Use for running scripts, installing packages, checking system state, etc."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError> {
        let command = input["command"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'command' parameter".into()))?;

        for pattern in &self.deny_patterns {
            if command.contains(pattern.as_str()) {
                return Err(ToolExecError::Failed(format!(
                    "Command blocked by safety policy: contains '{}'. This pattern is denied for safety.",
                    pattern
                )));
            }
        }

        if let Some(ref confirm) = self.confirm_fn {
            if !confirm(command) {
                return Err(ToolExecError::Failed(
                    "Command was not confirmed by the user.".into(),
                ));
            }
        }

        tracing::debug!(command, "bash tool invoked");

        let output = ctx
            .runtime
            .exec(
                command,
                ExecOptions {
                    cwd: None,
                    timeout: Some(self.timeout),
                    cancel: ctx.cancel,
                },
            )
            .await
            .map_err(|e| match e {
                crate::error::RuntimeError::Cancelled => ToolExecError::Cancelled,
                other => ToolExecError::Failed(other.to_string()),
            })?;

        let mut stdout = output.stdout;
        let mut stderr = output.stderr;

        if stdout.len() > self.max_output_bytes {
            stdout.truncate(self.max_output_bytes);
            stdout.push_str("\n... (output truncated)");
        }
        if stderr.len() > self.max_output_bytes {
            stderr.truncate(self.max_output_bytes);
            stderr.push_str("\n... (output truncated)");
        }

        let text = if stderr.is_empty() {
            format!("Exit code: {}\n{}", output.exit_code, stdout)
        } else {
            format!(
                "Exit code: {}\nSTDOUT:\n{}\nSTDERR:\n{}",
                output.exit_code, stdout, stderr
            )
        };

        tracing::debug!(exit_code = output.exit_code, "bash tool finished");
        Ok(text)
    }
}
