use crate::backend::{Backend, ColumnPatch};
use crate::domain::{
    move_between_columns, normalize, reindex_columns, BoardId, BoardState, Column, ColumnId, Task,
    TaskId,
};
use crate::error::{LanekitError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::fs;

/// Board metadata as stored on disk. Tasks live in individual files so
/// concurrent edits to different tasks produce small, mergeable diffs.
#[derive(Debug, Serialize, Deserialize)]
struct BoardMeta {
    id: BoardId,
    name: String,
    columns: Vec<Column>,
    next_task_number: u32,
}

/// File-based backend
///
/// Persists one board under `.lanekit/` in the given root: `board.json`
/// holds the board metadata and column order, `tasks/` one JSON file per
/// task. The authority for single-user, single-process setups.
pub struct FileBackend {
    root_path: PathBuf,
}

impl FileBackend {
    const LANEKIT_DIR: &'static str = ".lanekit";
    const TASKS_DIR: &'static str = "tasks";
    const BOARD_FILE: &'static str = "board.json";

    /// Creates a new FileBackend for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::LANEKIT_DIR),
        }
    }

    fn tasks_dir(&self) -> PathBuf {
        self.root_path.join(Self::TASKS_DIR)
    }

    fn board_file(&self) -> PathBuf {
        self.root_path.join(Self::BOARD_FILE)
    }

    fn task_file(&self, id: &TaskId) -> PathBuf {
        self.tasks_dir().join(format!("{}.json", id.as_str()))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    /// Initializes the directory structure, creating the given board if no
    /// board exists yet; returns the stored board either way.
    pub async fn initialize(&self, board: &BoardState) -> Result<BoardState> {
        self.ensure_directory_exists(&self.root_path).await?;
        self.ensure_directory_exists(&self.tasks_dir()).await?;

        let gitignore_path = self.root_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "# Local caches\n*.db\n*.db-*\n").await?;
        }

        if self.board_file().exists() {
            return self.load_state().await;
        }

        self.save_meta(board).await?;
        for task in board.tasks.values() {
            self.save_task(task).await?;
        }
        Ok(board.clone())
    }

    async fn save_meta(&self, board: &BoardState) -> Result<()> {
        let meta = BoardMeta {
            id: board.id,
            name: board.name.clone(),
            columns: board.columns.clone(),
            next_task_number: board.next_task_number,
        };
        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(self.board_file(), json).await?;
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        self.ensure_directory_exists(&self.tasks_dir()).await?;
        let json = serde_json::to_string_pretty(task)?;
        fs::write(self.task_file(&task.id), json).await?;
        Ok(())
    }

    /// Rewrites the task files of the given columns (their positions
    /// changed) plus the board metadata.
    async fn save_columns(&self, board: &BoardState, columns: &[&ColumnId]) -> Result<()> {
        self.save_meta(board).await?;
        for column_id in columns {
            for task in board.tasks_in(column_id) {
                self.save_task(task).await?;
            }
        }
        Ok(())
    }

    async fn load_task(&self, id: &TaskId) -> Result<Task> {
        let file_path = self.task_file(id);
        if !file_path.exists() {
            return Err(LanekitError::TaskNotFound(id.to_string()));
        }
        let contents = fs::read_to_string(&file_path).await?;
        let task: Task = serde_json::from_str(&contents)?;
        Ok(task)
    }

    async fn list_task_ids(&self) -> Result<Vec<TaskId>> {
        let tasks_dir = self.tasks_dir();
        if !tasks_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&tasks_dir).await?;
        let mut ids: Vec<TaskId> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(id) = TaskId::from_str(stem) {
                        ids.push(id);
                    }
                }
            }
        }

        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// Assembles the full board state from disk and normalizes it
    async fn load_state(&self) -> Result<BoardState> {
        let board_path = self.board_file();
        if !board_path.exists() {
            return Err(LanekitError::BoardNotFound(
                board_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&board_path).await?;
        let meta: BoardMeta = serde_json::from_str(&contents)?;

        let mut tasks = HashMap::new();
        for id in self.list_task_ids().await? {
            let task = self.load_task(&id).await?;
            tasks.insert(id, task);
        }

        let mut state = BoardState {
            id: meta.id,
            name: meta.name,
            columns: meta.columns,
            tasks,
            next_task_number: meta.next_task_number,
        };
        normalize(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn load_board(&self, board: &BoardId) -> Result<BoardState> {
        let state = self.load_state().await?;
        if &state.id != board {
            return Err(LanekitError::BoardNotFound(board.to_string()));
        }
        Ok(state)
    }

    async fn move_task(
        &self,
        task: &TaskId,
        dest_column: &ColumnId,
        dest_index: usize,
    ) -> Result<Task> {
        let state = self.load_state().await?;

        let (source_column, source_index) = state
            .locate_task(task)
            .ok_or_else(|| LanekitError::TaskNotFound(task.to_string()))?;
        let dest = state
            .find_column(dest_column)
            .ok_or_else(|| LanekitError::ColumnNotFound(dest_column.to_string()))?;

        let clamped = dest_index.min(dest.task_ids.len());
        let mut next = move_between_columns(
            &state,
            &source_column,
            dest_column,
            source_index,
            clamped,
        )?;

        let moved = next
            .tasks
            .get_mut(task)
            .ok_or_else(|| LanekitError::TaskNotFound(task.to_string()))?;
        moved.updated_at = Utc::now();
        let moved = moved.clone();

        self.save_columns(&next, &[&source_column, dest_column]).await?;
        Ok(moved)
    }

    async fn reorder_columns(&self, board: &BoardId, ordered: &[ColumnId]) -> Result<()> {
        let mut state = self.load_board(board).await?;

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
        self.save_meta(&state).await?;
        Ok(())
    }

    async fn update_column(&self, column: &ColumnId, patch: ColumnPatch) -> Result<Column> {
        let mut state = self.load_state().await?;

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
        let updated = target.clone();

        self.save_meta(&state).await?;
        Ok(updated)
    }
}
