//! Runtime — the side-effect boundary tools call into (§4.2).
//!
//! Only one concrete implementation ships here: [`LocalRuntime`], a thin
//! wrapper over `bash -c` and `tokio::fs`. Sandboxed or remote runtimes are
//! out of scope for this crate — implement [`Runtime`] for those.

use crate::error::RuntimeError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub cwd: Option<String>,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[async_trait]
pub trait Runtime: Send + Sync {
    fn cwd(&self) -> &str;

    async fn exec(&self, command: &str, opts: ExecOptions) -> Result<ExecOutput, RuntimeError>;

    async fn read_file(&self, path: &str) -> Result<String, RuntimeError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), RuntimeError>;
}

/// Executes commands via `bash -c` in a fixed working directory and reads
/// and writes files on the local filesystem.
pub struct LocalRuntime {
    cwd: String,
}

impl LocalRuntime {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl Runtime for LocalRuntime {
    fn cwd(&self) -> &str {
        &self.cwd
    }

    async fn exec(&self, command: &str, opts: ExecOptions) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(command);
        cmd.current_dir(opts.cwd.as_deref().unwrap_or(&self.cwd));
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let output = if let Some(timeout) = opts.timeout {
            tokio::select! {
                _ = opts.cancel.cancelled() => return Err(RuntimeError::Cancelled),
                _ = tokio::time::sleep(timeout) => return Err(RuntimeError::Timeout),
                result = cmd.output() => result?,
            }
        } else {
            tokio::select! {
                _ = opts.cancel.cancelled() => return Err(RuntimeError::Cancelled),
                result = cmd.output() => result?,
            }
        };

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn read_file(&self, path: &str) -> Result<String, RuntimeError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), RuntimeError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(tokio::fs::write(path, content).await?)
    }
}
