//! Edit tool — surgical search/replace edits on files.
//!
//! This is the most important tool for coding agents. Instead of rewriting
//! entire files, the agent specifies exact text to find and replace.
//! Modeled after Claude Code's Edit tool and Aider's search/replace blocks.

use crate::error::ToolExecError;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;

/// Surgical file editing via exact text search/replace.
pub struct EditFileTool;

impl Default for EditFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EditFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Make a surgical edit to a file by specifying exact text to find and replace. The old_text must match exactly (including whitespace and indentation). For creating new files, use write_file instead."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to edit"
                },
                "old_text": {
                    "type": "string",
                    "description": "Exact text to find (must match exactly, including whitespace)"
                },
                "new_text": {
                    "type": "string",
                    "description": "Text to replace it with"
                }
            },
            "required": ["path", "old_text", "new_text"]
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
        let old_text = input["old_text"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'old_text' parameter".into()))?;
        let new_text = input["new_text"]
            .as_str()
            .ok_or_else(|| ToolExecError::InvalidArgs("missing 'new_text' parameter".into()))?;

        if ctx.cancel.is_cancelled() {
            return Err(ToolExecError::Cancelled);
        }

        let content = ctx.runtime.read_file(path).await.map_err(|e| {
            ToolExecError::Failed(format!(
                "Cannot read {}: {}. Use write_file to create new files.",
                path, e
            ))
        })?;

        let match_count = content.matches(old_text).count();

        if match_count == 0 {
            let suggestion = find_similar_text(&content, old_text);
            let hint = if let Some(similar) = suggestion {
                format!(
                    "\n\nDid you mean:\n```\n{}\n```\nMake sure old_text matches exactly, including whitespace and indentation.",
                    similar
                )
            } else {
                "\n\nTip: Use read_file to see the current file contents, then copy the exact text you want to replace.".into()
            };

            return Err(ToolExecError::Failed(format!(
                "old_text not found in {}.{}",
                path, hint
            )));
        }

        if match_count > 1 {
            return Err(ToolExecError::Failed(format!(
                "old_text matches {} locations in {}. Include more surrounding context to make the match unique.",
                match_count, path
            )));
        }

        let new_content = content.replacen(old_text, new_text, 1);

        ctx.runtime
            .write_file(path, &new_content)
            .await
            .map_err(|e| ToolExecError::Failed(format!("Cannot write {}: {}", path, e)))?;

        let old_lines = old_text.lines().count();
        let new_lines = new_text.lines().count();
        let summary = if old_text == new_text {
            "No changes (old_text == new_text)".to_string()
        } else {
            format!(
                "Replaced {} line{} with {} line{} in {}",
                old_lines,
                if old_lines == 1 { "" } else { "s" },
                new_lines,
                if new_lines == 1 { "" } else { "s" },
                path
            )
        };

        Ok(summary)
    }
}

/// Fuzzy match for better error messages: find the region of the file most
/// likely to be what the caller meant.
fn find_similar_text(content: &str, target: &str) -> Option<String> {
    let target_trimmed = target.trim();
    if target_trimmed.is_empty() {
        return None;
    }

    let first_line = target_trimmed.lines().next()?;
    let first_line_trimmed = first_line.trim();
    if first_line_trimmed.is_empty() {
        return None;
    }

    let lines: Vec<&str> = content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if line.contains(first_line_trimmed) {
            let start = i;
            let target_line_count = target_trimmed.lines().count();
            let end = (i + target_line_count + 1).min(lines.len());
            return Some(lines[start..end].join("\n"));
        }
    }

    None
}
