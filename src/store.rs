//! Persistence boundary for session history (§6). Only an in-memory store
//! and a JSONL file store ship here — a database-backed store is an
//! application-layer concern.

use crate::error::StoreError;
use crate::history::SessionEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Vec<SessionEntry>, StoreError>;
    async fn append(&self, session_id: &str, entry: &SessionEntry) -> Result<(), StoreError>;
    async fn exists(&self, session_id: &str) -> Result<bool, StoreError>;
}

/// Keeps every session's entries in a `Mutex<HashMap>`. Gone when the
/// process exits — fine for tests and short-lived agents.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, Vec<SessionEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load(&self, session_id: &str) -> Result<Vec<SessionEntry>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, entry: &SessionEntry) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().unwrap().contains_key(session_id))
    }
}

/// Appends one JSON object per line to `<dir>/<session_id>.jsonl`. A
/// malformed line (truncated by a crash mid-write) is skipped rather than
/// failing the whole load.
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.jsonl"))
    }
}

#[async_trait]
impl Store for JsonlStore {
    async fn load(&self, session_id: &str) -> Result<Vec<SessionEntry>, StoreError> {
        let path = self.path_for(session_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "skipping malformed history line");
                }
            }
        }
        Ok(entries)
    }

    async fn append(&self, session_id: &str, entry: &SessionEntry) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(session_id))
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(session_id)).await?)
    }
}
