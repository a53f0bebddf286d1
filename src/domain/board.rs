use crate::domain::task::{ColumnId, Task, TaskId};
use crate::error::{LanekitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardId(Uuid);

impl BoardId {
    /// Generates a fresh board ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BoardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A kanban board column
///
/// A column owns an ordered sequence of task references (`task_ids`); the
/// task objects themselves live in the board's keyed collection. `position`
/// is the column's zero-based index in the board's display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub position: u32,
    /// Maximum task count before the WIP warning shows. `None` or `Some(0)`
    /// means unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ColumnId::from_name(&name),
            name,
            position: 0,
            wip_limit: None,
            task_ids: Vec::new(),
        }
    }

    pub fn with_wip_limit(mut self, limit: u32) -> Self {
        self.wip_limit = Some(limit);
        self
    }
}

/// Kanban board state
///
/// Columns are kept sorted by `position`; tasks are a keyed collection and
/// appear in exactly one column's `task_ids` at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub id: BoardId,
    pub name: String,
    pub columns: Vec<Column>,
    pub tasks: HashMap<TaskId, Task>,
    pub next_task_number: u32,
}

impl BoardState {
    /// Creates a board with the default column set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::new(),
            name: name.into(),
            columns: Self::default_columns(),
            tasks: HashMap::new(),
            next_task_number: 1,
        }
    }

    /// The default columns for a new board
    pub fn default_columns() -> Vec<Column> {
        let mut columns = vec![
            Column::new("To Do"),
            Column::new("In Progress"),
            Column::new("Done"),
        ];
        for (index, column) in columns.iter_mut().enumerate() {
            column.position = index as u32;
        }
        columns
    }

    /// Generates the next task ID
    pub fn next_task_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_task_number);
        self.next_task_number += 1;
        id
    }

    /// Creates a task at the end of the given column
    pub fn add_task(&mut self, title: impl Into<String>, column_id: &ColumnId) -> Result<TaskId> {
        let column = self
            .columns
            .iter()
            .position(|c| &c.id == column_id)
            .ok_or_else(|| LanekitError::ColumnNotFound(column_id.to_string()))?;

        let id = self.next_task_id();
        let mut task = Task::new(id.clone(), title.into(), column_id.clone());
        task.position = self.columns[column].task_ids.len() as u32;

        self.columns[column].task_ids.push(id.clone());
        self.tasks.insert(id.clone(), task);
        Ok(id)
    }

    /// Looks up a column by ID
    pub fn find_column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Looks up a column's index in the display order
    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Returns the tasks of a column in display order
    pub fn tasks_in(&self, id: &ColumnId) -> Vec<&Task> {
        self.find_column(id)
            .map(|column| {
                column
                    .task_ids
                    .iter()
                    .filter_map(|task_id| self.tasks.get(task_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Finds a task's current column and index within it
    pub fn locate_task(&self, id: &TaskId) -> Option<(ColumnId, usize)> {
        for column in &self.columns {
            if let Some(index) = column.task_ids.iter().position(|t| t == id) {
                return Some((column.id.clone(), index));
            }
        }
        None
    }

    /// Total task count across all columns
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
