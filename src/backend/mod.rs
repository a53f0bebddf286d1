use crate::{
    domain::{BoardId, BoardState, Column, ColumnId, Task, TaskId},
    error::Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;

#[cfg(feature = "file-backend")]
pub mod file;

/// Partial update for a column's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPatch {
    /// New display name, if changing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New WIP limit, if changing (`Some(None)` clears the limit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<Option<u32>>,
}

/// Persistence backend for board state
///
/// The authority the optimistic update engine reports to: a session commits
/// locally first, then calls one of these; a rejection rolls the local
/// commit back. Implementations apply the same move semantics the engine
/// does, so an acknowledged move needs no further local change.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Loads a full board snapshot (on session open and on resync)
    async fn load_board(&self, board: &BoardId) -> Result<BoardState>;

    /// Moves a task to the given position in the destination column and
    /// returns the task as persisted
    async fn move_task(
        &self,
        task: &TaskId,
        dest_column: &ColumnId,
        dest_index: usize,
    ) -> Result<Task>;

    /// Replaces a board's column order with the given sequence
    async fn reorder_columns(&self, board: &BoardId, ordered: &[ColumnId]) -> Result<()>;

    /// Applies a configuration patch to a column and returns it as persisted
    async fn update_column(&self, column: &ColumnId, patch: ColumnPatch) -> Result<Column>;
}
