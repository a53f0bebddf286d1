use crate::backend::{Backend, ColumnPatch};
use crate::domain::{
    move_between_columns, reindex_columns, BoardId, BoardState, Column, ColumnId, Task, TaskId,
};
use crate::error::{LanekitError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

/// In-memory backend
///
/// Holds one board behind a mutex and applies the same reorder algorithms
/// the engine uses, acting as the authority for tests, demos, and
/// single-process deployments.
pub struct InMemoryBackend {
    board: Mutex<BoardState>,
}

impl InMemoryBackend {
    pub fn new(board: BoardState) -> Self {
        Self {
            board: Mutex::new(board),
        }
    }

    /// The board currently persisted, as a snapshot
    pub fn snapshot(&self) -> BoardState {
        self.board.lock().expect("board lock poisoned").clone()
    }

    fn check_board(&self, state: &BoardState, board: &BoardId) -> Result<()> {
        if &state.id != board {
            return Err(LanekitError::BoardNotFound(board.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn load_board(&self, board: &BoardId) -> Result<BoardState> {
        let state = self.board.lock().expect("board lock poisoned");
        self.check_board(&state, board)?;
        Ok(state.clone())
    }

    async fn move_task(
        &self,
        task: &TaskId,
        dest_column: &ColumnId,
        dest_index: usize,
    ) -> Result<Task> {
        let mut state = self.board.lock().expect("board lock poisoned");

        let (source_column, source_index) = state
            .locate_task(task)
            .ok_or_else(|| LanekitError::TaskNotFound(task.to_string()))?;
        let dest = state
            .find_column(dest_column)
            .ok_or_else(|| LanekitError::ColumnNotFound(dest_column.to_string()))?;

        // The caller computed the index against its own (possibly stale)
        // replica; the authority clamps rather than rejects.
        let clamped = dest_index.min(dest.task_ids.len());
        let next = move_between_columns(
            &state,
            &source_column,
            dest_column,
            source_index,
            clamped,
        )?;
        *state = next;

        let moved = state
            .tasks
            .get_mut(task)
            .ok_or_else(|| LanekitError::TaskNotFound(task.to_string()))?;
        moved.updated_at = Utc::now();
        Ok(moved.clone())
    }

    async fn reorder_columns(&self, board: &BoardId, ordered: &[ColumnId]) -> Result<()> {
        let mut state = self.board.lock().expect("board lock poisoned");
        self.check_board(&state, board)?;

        if ordered.len() != state.columns.len() {
            return Err(LanekitError::IndexOutOfRange {
                index: ordered.len(),
                len: state.columns.len(),
            });
        }

        let mut reordered = Vec::with_capacity(ordered.len());
        for id in ordered {
            let index = state
                .column_index(id)
                .ok_or_else(|| LanekitError::ColumnNotFound(id.to_string()))?;
            reordered.push(state.columns[index].clone());
        }

        state.columns = reordered;
        reindex_columns(&mut state);
        Ok(())
    }

    async fn update_column(&self, column: &ColumnId, patch: ColumnPatch) -> Result<Column> {
        let mut state = self.board.lock().expect("board lock poisoned");

        let target = state
            .columns
            .iter_mut()
            .find(|c| &c.id == column)
            .ok_or_else(|| LanekitError::ColumnNotFound(column.to_string()))?;

        if let Some(name) = patch.name {
            target.name = name;
        }
        if let Some(wip_limit) = patch.wip_limit {
            target.wip_limit = wip_limit;
        }
        Ok(target.clone())
    }
}
