//! Search tool — grep/ripgrep-style search across files, run through the
//! tool context's runtime.

use crate::error::ToolExecError;
use crate::runtime::ExecOptions;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;
use std::time::Duration;

pub struct SearchTool {
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for SearchTool {
    fn default() -> Self {
        Self {
            max_results: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SearchTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for a pattern across files using grep. Returns matching lines with file paths and line numbers. Supports regex patterns."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Search pattern (regex supported)"
                },
                "path": {
                    "type": "string",
                    "description": "Directory or file to search in (optional, defaults to working directory)"
                },
                "include": {
                    "type": "string",
                    "description": "File glob pattern to include, e.g. '*.rs' (optional)"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Case sensitive search (default: false)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError> {
        let pattern = input["pattern"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'pattern' parameter".into()))?;
        let search_path = input["path"].as_str().unwrap_or(".");
        let include = input["include"].as_str();
        let case_sensitive = input["case_sensitive"].as_bool().unwrap_or(false);

        if ctx.cancel.is_cancelled() {
            return Err(ToolExecError::Cancelled);
        }

        let mut command = format!(
            "grep -r -n -m{} {} {} {}",
            self.max_results,
            if case_sensitive { "" } else { "-i" },
            if let Some(glob) = include {
                format!("--include={}", shell_quote(glob))
            } else {
                String::new()
            },
            shell_quote(pattern),
        );
        command.push(' ');
        command.push_str(&shell_quote(search_path));

        let output = ctx
            .runtime
            .exec(
                &command,
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

        // grep's exit code isn't surfaced by our Runtime::exec beyond stdout,
        // so "no output" is read as "no matches" rather than an error.
        if output.stdout.trim().is_empty() {
            return Ok(format!("No matches found for '{}'", pattern));
        }

        let match_count = output.stdout.lines().count();
        let text = if match_count >= self.max_results {
            format!(
                "{}\n... (showing first {} matches)",
                output.stdout.trim(),
                self.max_results
            )
        } else {
            format!("{}\n({} matches)", output.stdout.trim(), match_count)
        };

        Ok(text)
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
