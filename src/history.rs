//! Session history DAG and context reconstruction (§3, §4.5).
//!
//! Entries form a parent-pointer forest; `build_context` is the one pure
//! function that turns a chosen leaf into the linear message sequence the
//! model sees.

use crate::types::ModelMessage;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One node in a session's history DAG. Immutable once persisted — new
/// writes only ever extend the log (§3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEntry {
    #[serde(rename = "message")]
    Message {
        id: String,
        #[serde(rename = "parentId")]
        parent_id: Option<String>,
        timestamp: u64,
        message: ModelMessage,
    },
    /// Replaces everything on the path strictly before `first_kept_id` with
    /// a textual summary.
    #[serde(rename = "compaction")]
    Compaction {
        id: String,
        #[serde(rename = "parentId")]
        parent_id: Option<String>,
        timestamp: u64,
        summary: String,
        #[serde(rename = "firstKeptId")]
        first_kept_id: String,
    },
}

impl SessionEntry {
    pub fn id(&self) -> &str {
        match self {
            Self::Message { id, .. } => id,
            Self::Compaction { id, .. } => id,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Message { parent_id, .. } => parent_id.as_deref(),
            Self::Compaction { parent_id, .. } => parent_id.as_deref(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Message { timestamp, .. } => *timestamp,
            Self::Compaction { timestamp, .. } => *timestamp,
        }
    }
}

/// Reconstruct the linear message sequence the model should see, walking
/// from `leaf_id` back to the root and reversing.
///
/// Total: terminates even on a cyclic `parent_id` chain, returning at most
/// `entries.len() + 1` messages (the `+1` is the synthetic compaction
/// summary message).
pub fn build_context(entries: &[SessionEntry], leaf_id: Option<&str>) -> Vec<ModelMessage> {
    let Some(leaf_id) = leaf_id else {
        return Vec::new();
    };
    if entries.is_empty() {
        return Vec::new();
    }

    let by_id: HashMap<&str, &SessionEntry> = entries.iter().map(|e| (e.id(), e)).collect();

    // Walk leaf -> root, guarding against cycles, then reverse.
    let mut path_rev: Vec<&SessionEntry> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut cursor = Some(leaf_id);
    while let Some(id) = cursor {
        if !visited.insert(id) {
            break;
        }
        let Some(entry) = by_id.get(id) else {
            break;
        };
        path_rev.push(entry);
        cursor = entry.parent_id();
    }
    let path: Vec<&SessionEntry> = path_rev.into_iter().rev().collect();

    // Latest compaction on the path wins; earlier ones are shadowed.
    let compaction_index = path
        .iter()
        .enumerate()
        .rev()
        .find(|(_, e)| matches!(e, SessionEntry::Compaction { .. }))
        .map(|(i, _)| i);

    let mut out = Vec::new();

    let Some(idx) = compaction_index else {
        for entry in &path {
            if let SessionEntry::Message { message, .. } = entry {
                out.push(message.clone());
            }
        }
        return out;
    };

    let SessionEntry::Compaction {
        summary,
        first_kept_id,
        ..
    } = path[idx]
    else {
        unreachable!()
    };

    out.push(ModelMessage::user(format!(
        "<summary>{}</summary>",
        summary
    )));

    let prefix = &path[..idx];
    let kept_start = prefix.iter().position(|e| e.id() == first_kept_id.as_str());
    if let Some(start) = kept_start {
        for entry in &prefix[start..] {
            if let SessionEntry::Message { message, .. } = entry {
                out.push(message.clone());
            }
        }
    }

    for entry in &path[idx + 1..] {
        if let SessionEntry::Message { message, .. } = entry {
            out.push(message.clone());
        }
    }

    out
}
