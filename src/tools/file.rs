//! File tools — read and write files with safety limits.

use crate::error::ToolExecError;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;

/// Read a file's contents. Supports a line range for large files.
pub struct ReadFileTool {
    /// Max file size to read (prevents OOM).
    pub max_bytes: usize,
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
        }
    }
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's contents. Optionally specify offset (1-indexed line) and limit (number of lines) for large files."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to read"
                },
                "offset": {
                    "type": "integer",
                    "description": "Starting line number (1-indexed, optional)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (optional)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError> {
        let path = input["path"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'path' parameter".into()))?;

        if ctx.cancel.is_cancelled() {
            return Err(ToolExecError::Cancelled);
        }

        let content = ctx
            .runtime
            .read_file(path)
            .await
            .map_err(|e| ToolExecError::Failed(format!("Cannot read {}: {}", path, e)))?;

        if content.len() > self.max_bytes {
            return Err(ToolExecError::Failed(format!(
                "File too large ({} bytes, max {}). Use offset/limit for partial reads.",
                content.len(),
                self.max_bytes
            )));
        }

        let offset = input["offset"].as_u64().map(|v| v.max(1) as usize);
        let limit = input["limit"].as_u64().map(|v| v as usize);

        let output = match (offset, limit) {
            (Some(off), Some(lim)) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = (off - 1).min(lines.len());
                let end = (start + lim).min(lines.len());
                let total = lines.len();
                let slice = lines[start..end].join("\n");
                format!("[Lines {}-{} of {}]\n{}", start + 1, end, total, slice)
            }
            (Some(off), None) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = (off - 1).min(lines.len());
                let total = lines.len();
                let slice = lines[start..].join("\n");
                format!("[Lines {}-{} of {}]\n{}", start + 1, total, total, slice)
            }
            (None, Some(lim)) => {
                let lines: Vec<&str> = content.lines().collect();
                let end = lim.min(lines.len());
                let total = lines.len();
                let slice = lines[..end].join("\n");
                format!("[Lines 1-{} of {}]\n{}", end, total, slice)
            }
            (None, None) => content,
        };

        Ok(output)
    }
}

// ---------------------------------------------------------------------------

/// Write content to a file. Creates parent directories if needed.
pub struct WriteFileTool;

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, overwrites if it does. Creates parent directories automatically."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolExecError> {
        let path = input["path"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'path' parameter".into()))?;
        let content = input["content"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'content' parameter".into()))?;

        if ctx.cancel.is_cancelled() {
            return Err(ToolExecError::Cancelled);
        }

        ctx.runtime
            .write_file(path, content)
            .await
            .map_err(|e| ToolExecError::Failed(format!("Cannot write {}: {}", path, e)))?;

        Ok(format!("Wrote {} bytes to {}", content.len(), path))
    }
}
