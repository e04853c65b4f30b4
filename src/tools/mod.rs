//! Illustrative tool set, kept as a demonstration of the [`crate::tool::Tool`]
//! trait — not part of the turn-loop core (§1 "Out of scope").

pub mod bash;
pub mod edit;
pub mod file;
pub mod list;
pub mod search;

pub use bash::BashTool;
pub use edit::EditFileTool;
pub use file::{ReadFileTool, WriteFileTool};
pub use list::ListFilesTool;
pub use search::SearchTool;

use crate::tool::Tool;
use std::sync::Arc;

/// The standard illustrative tool set: shell, file read/write/edit, list,
/// search.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(BashTool::default()),
        Arc::new(ReadFileTool::default()),
        Arc::new(WriteFileTool::new()),
        Arc::new(EditFileTool::new()),
        Arc::new(ListFilesTool::default()),
        Arc::new(SearchTool::default()),
    ]
}
