//! List files tool — directory exploration via `find`, run through the
//! tool context's runtime.

use crate::error::ToolExecError;
use crate::runtime::ExecOptions;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;
use std::time::Duration;

pub struct ListFilesTool {
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for ListFilesTool {
    fn default() -> Self {
        Self {
            max_results: 200,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ListFilesTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories. Optionally filter by glob pattern. Use to explore project structure before reading specific files."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (default: current directory)"
                },
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern to filter files, e.g. '*.rs' (optional)"
                },
                "max_depth": {
                    "type": "integer",
                    "description": "Maximum directory depth (default: 3)"
                }
            }
        })
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError> {
        let path = input["path"].as_str().unwrap_or(".");
        let pattern = input["pattern"].as_str();
        let max_depth = input["max_depth"].as_u64().unwrap_or(3);

        if ctx.cancel.is_cancelled() {
            return Err(ToolExecError::Cancelled);
        }

        let mut command = format!(
            "find {} -maxdepth {} -not -path '*/target/*' -not -path '*/.git/*' -not -path '*/node_modules/*' -type f",
            shell_quote(path),
            max_depth
        );
        if let Some(pat) = pattern {
            command.push_str(&format!(" -name {}", shell_quote(pat)));
        }

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

        let mut lines: Vec<&str> = output.stdout.lines().collect();
        lines.sort_unstable();

        let total = lines.len();
        let truncated = total > self.max_results;
        if truncated {
            lines.truncate(self.max_results);
        }

        let text = if lines.is_empty() {
            format!("No files found in {}", path)
        } else if truncated {
            format!(
                "{}\n\n... ({} files, showing first {})",
                lines.join("\n"),
                total,
                self.max_results
            )
        } else {
            format!("{}\n\n({} files)", lines.join("\n"), total)
        };

        Ok(text)
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
