//! Tests for the illustrative tool set against a real `LocalRuntime`.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use turnframe::runtime::LocalRuntime;
use turnframe::tool::{Tool, ToolContext};
use turnframe::tools::{BashTool, EditFileTool, ReadFileTool, WriteFileTool};

fn ctx(cwd: &str) -> ToolContext {
    ToolContext {
        runtime: Arc::new(LocalRuntime::new(cwd)),
        cancel: CancellationToken::new(),
    }
}

#[tokio::test]
async fn bash_tool_captures_stdout_and_exit_code() {
    let tool = BashTool::default();
    let result = tool
        .execute(serde_json::json!({"command": "echo hi"}), ctx("."))
        .await
        .unwrap();
    assert!(result.contains("Exit code: 0"));
    assert!(result.contains("hi"));
}

#[tokio::test]
async fn bash_tool_blocks_denied_patterns() {
    let tool = BashTool::default();
    let err = tool
        .execute(serde_json::json!({"command": "rm -rf /"}), ctx("."))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("blocked"));
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    let path_str = path.to_str().unwrap();

    let write_tool = WriteFileTool::new();
    write_tool
        .execute(
            serde_json::json!({"path": path_str, "content": "hello\nworld"}),
            ctx(dir.path().to_str().unwrap()),
        )
        .await
        .unwrap();

    let read_tool = ReadFileTool::default();
    let content = read_tool
        .execute(serde_json::json!({"path": path_str}), ctx(dir.path().to_str().unwrap()))
        .await
        .unwrap();
    assert_eq!(content, "hello\nworld");
}

#[tokio::test]
async fn edit_tool_requires_unique_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.txt");
    tokio::fs::write(&path, "foo\nfoo\n").await.unwrap();
    let path_str = path.to_str().unwrap();

    let edit_tool = EditFileTool::new();
    let err = edit_tool
        .execute(
            serde_json::json!({"path": path_str, "old_text": "foo", "new_text": "bar"}),
            ctx(dir.path().to_str().unwrap()),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("matches 2 locations"));
}

#[tokio::test]
async fn edit_tool_replaces_unique_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.txt");
    tokio::fs::write(&path, "foo\nbaz\n").await.unwrap();
    let path_str = path.to_str().unwrap();

    let edit_tool = EditFileTool::new();
    edit_tool
        .execute(
            serde_json::json!({"path": path_str, "old_text": "foo", "new_text": "bar"}),
            ctx(dir.path().to_str().unwrap()),
        )
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(content, "bar\nbaz\n");
}
